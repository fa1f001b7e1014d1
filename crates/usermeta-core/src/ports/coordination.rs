//! Coordination store contract used for advisory locks

use crate::StoreResult;
use async_trait::async_trait;
use std::time::Duration;

/// Shared key-value store reachable by every server instance.
///
/// Contention and connectivity are kept apart: an existing key is
/// `Ok(false)` from `set_if_absent`, a broken store is `Err`.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Create `key` holding `value` with the given time-to-live, unless the
    /// key already exists. Must be a single atomic conditional write.
    ///
    /// Returns `true` when this call created the record.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Trivial round trip used as a liveness probe.
    async fn ping(&self) -> StoreResult<()>;

    /// Release pooled connections. Later operations fail with `StoreError::Closed`.
    async fn close(&self) -> StoreResult<()>;
}
