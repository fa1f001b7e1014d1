//! In-memory user store using DashMap

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use usermeta_core::{MetaKey, StoreError, StoreResult, User, UserMeta, UserStore};

pub struct MemoryUserStore {
    users: DashMap<String, User>,
    metas: DashMap<(i64, MetaKey), UserMeta>,
    next_id: AtomicI64,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            metas: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, user_name: &str, password_hash: &str) -> StoreResult<User> {
        match self.users.entry(user_name.to_string()) {
            Entry::Occupied(_) => Err(StoreError::Backend(format!(
                "duplicate user_name: {}",
                user_name
            ))),
            Entry::Vacant(entry) => {
                let now = Utc::now();
                let user = User {
                    id: self.next_id.fetch_add(1, Ordering::SeqCst),
                    user_name: user_name.to_string(),
                    password_hash: password_hash.to_string(),
                    created_at: now,
                    updated_at: now,
                };
                entry.insert(user.clone());
                Ok(user)
            }
        }
    }

    async fn find_user_by_name(&self, user_name: &str) -> StoreResult<Option<User>> {
        Ok(self.users.get(user_name).map(|user| user.clone()))
    }

    async fn user_exists(&self, id: i64) -> StoreResult<bool> {
        Ok(self.users.iter().any(|user| user.id == id))
    }

    async fn upsert_meta(&self, user_id: i64, key: MetaKey, value: &str) -> StoreResult<()> {
        let now = Utc::now();
        self.metas
            .entry((user_id, key))
            .and_modify(|meta| {
                meta.value = value.to_string();
                meta.updated_at = now;
            })
            .or_insert_with(|| UserMeta {
                user_id,
                key,
                value: value.to_string(),
                created_at: now,
                updated_at: now,
            });
        Ok(())
    }

    async fn list_meta(&self, user_id: i64, key: Option<MetaKey>) -> StoreResult<Vec<UserMeta>> {
        let mut metas: Vec<UserMeta> = self
            .metas
            .iter()
            .filter(|meta| meta.user_id == user_id && key.map_or(true, |k| meta.key == k))
            .map(|meta| meta.clone())
            .collect();
        metas.sort_by_key(|meta| meta.key.as_str());
        Ok(metas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_users() {
        let store = MemoryUserStore::new();

        let user = store.create_user("someone-1", "hash").await.unwrap();
        assert_eq!(user.id, 1);
        assert!(store.create_user("someone-1", "hash").await.is_err());

        let found = store.find_user_by_name("someone-1").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(store.user_exists(1).await.unwrap());
        assert!(!store.user_exists(2).await.unwrap());
    }

    #[tokio::test]
    async fn test_meta_upsert_and_filter() {
        let store = MemoryUserStore::new();

        store.upsert_meta(1, MetaKey::Age, "22").await.unwrap();
        store.upsert_meta(1, MetaKey::Age, "23").await.unwrap();
        store.upsert_meta(1, MetaKey::Gender, "male").await.unwrap();
        store.upsert_meta(2, MetaKey::Age, "40").await.unwrap();

        let all = store.list_meta(1, None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].key, MetaKey::Age);
        assert_eq!(all[0].value, "23");

        let gender = store.list_meta(1, Some(MetaKey::Gender)).await.unwrap();
        assert_eq!(gender.len(), 1);
        assert_eq!(gender[0].value, "male");
    }
}
