//! User metadata reads and writes

use crate::error::ApiError;
use std::sync::Arc;
use tracing::debug;
use usermeta_core::{Gender, MetaEntry, MetaKey, UserStore};

pub struct MetaService {
    users: Arc<dyn UserStore>,
}

impl MetaService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    async fn ensure_user(&self, user_id: i64) -> Result<(), ApiError> {
        if !self.users.user_exists(user_id).await? {
            return Err(ApiError::NotFound("user not found".to_string()));
        }
        Ok(())
    }

    /// Apply the recognized `age` / `gender` parameters. Others are ignored.
    ///
    /// Everything is validated before anything is written. For a repeated
    /// parameter the first value wins.
    pub async fn update(&self, user_id: i64, params: &[(String, String)]) -> Result<(), ApiError> {
        self.ensure_user(user_id).await?;

        let mut updates: Vec<(MetaKey, String)> = Vec::new();

        if let Some(value) = first_value(params, MetaKey::Age) {
            let age = value
                .parse::<i64>()
                .ok()
                .filter(|age| *age > 0)
                .ok_or_else(|| ApiError::bad_request("invalid age"))?;
            updates.push((MetaKey::Age, age.to_string()));
        }

        if let Some(value) = first_value(params, MetaKey::Gender) {
            let gender = value
                .parse::<Gender>()
                .map_err(|e| ApiError::bad_request(e.to_string()))?;
            updates.push((MetaKey::Gender, gender.as_str().to_string()));
        }

        for (key, value) in updates {
            debug!(user_id, key = %key, "Updating meta");
            self.users.upsert_meta(user_id, key, &value).await?;
        }

        Ok(())
    }

    /// List metadata, narrowed to `key` when given
    pub async fn get(&self, user_id: i64, key: Option<&str>) -> Result<Vec<MetaEntry>, ApiError> {
        let key = match key.filter(|k| !k.is_empty()) {
            Some(k) => Some(
                k.parse::<MetaKey>()
                    .map_err(|e| ApiError::bad_request(e.to_string()))?,
            ),
            None => None,
        };

        self.ensure_user(user_id).await?;

        let metas = self.users.list_meta(user_id, key).await?;
        Ok(metas.into_iter().map(MetaEntry::from).collect())
    }
}

fn first_value(params: &[(String, String)], key: MetaKey) -> Option<&str> {
    params
        .iter()
        .find(|(name, _)| name == key.as_str())
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryUserStore;

    async fn service_with_user() -> (MetaService, i64) {
        let users = Arc::new(MemoryUserStore::new());
        let user = users.create_user("someone-1", "hash").await.unwrap();
        (MetaService::new(users), user.id)
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_update_and_get() {
        let (metas, id) = service_with_user().await;

        metas
            .update(id, &params(&[("age", "22"), ("gender", "female")]))
            .await
            .unwrap();

        let all = metas.get(id, None).await.unwrap();
        assert_eq!(
            all,
            vec![
                MetaEntry {
                    key: "age".to_string(),
                    value: "22".to_string()
                },
                MetaEntry {
                    key: "gender".to_string(),
                    value: "female".to_string()
                },
            ]
        );

        let gender = metas.get(id, Some("gender")).await.unwrap();
        assert_eq!(gender.len(), 1);
    }

    #[tokio::test]
    async fn test_age_beyond_32_bits_accepted() {
        let (metas, id) = service_with_user().await;

        metas
            .update(id, &params(&[("age", "3000000000")]))
            .await
            .unwrap();

        let age = metas.get(id, Some("age")).await.unwrap();
        assert_eq!(age[0].value, "3000000000");
    }

    #[tokio::test]
    async fn test_invalid_values_write_nothing() {
        let (metas, id) = service_with_user().await;

        let err = metas
            .update(id, &params(&[("age", "30"), ("gender", "other")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "invalid gender"));

        for bad_age in ["0", "-3", "abc", "9223372036854775808"] {
            let err = metas
                .update(id, &params(&[("age", bad_age)]))
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(ref m) if m == "invalid age"));
        }

        assert!(metas.get(id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_and_key() {
        let (metas, id) = service_with_user().await;

        assert!(matches!(
            metas.update(id + 100, &params(&[("age", "20")])).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            metas.get(id, Some("height")).await,
            Err(ApiError::BadRequest(_))
        ));
    }
}
