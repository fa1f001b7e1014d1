//! Storage traits for persistence

use crate::StoreResult;
use async_trait::async_trait;
use usermeta_types::{MetaKey, User, UserMeta};

/// User and metadata store
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user_name: &str, password_hash: &str) -> StoreResult<User>;
    async fn find_user_by_name(&self, user_name: &str) -> StoreResult<Option<User>>;
    async fn user_exists(&self, id: i64) -> StoreResult<bool>;

    /// Insert or overwrite the `(user_id, key)` row
    async fn upsert_meta(&self, user_id: i64, key: MetaKey, value: &str) -> StoreResult<()>;

    /// List a user's metadata, optionally narrowed to one key
    async fn list_meta(&self, user_id: i64, key: Option<MetaKey>) -> StoreResult<Vec<UserMeta>>;
}
