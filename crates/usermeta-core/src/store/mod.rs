//! Coordination store implementations

pub mod memory;

pub use memory::MemoryStore;

use crate::{StoreError, StoreResult};
use std::future::Future;
use std::time::Duration;

/// Bound a store round trip by `limit`.
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_elapsed() {
        let result: StoreResult<()> = with_timeout(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(StoreError::Timeout(Duration::from_millis(50))));
    }

    #[tokio::test]
    async fn test_with_timeout_passes_through() {
        let result = with_timeout(Duration::from_secs(1), async { Ok(5) }).await;
        assert_eq!(result, Ok(5));
    }
}
