//! Startup connection retries
//!
//! Dependent stores may come up after this process does. Each target is
//! opened and probed in a loop with a fixed interval between attempts and a
//! bounded number of attempts, after which startup fails instead of hanging.

use crate::{BootstrapError, StoreResult};
use std::future::Future;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,
    /// Wait between two consecutive attempts
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }
}

/// Run `attempt` until it succeeds or the policy is exhausted.
///
/// `attempt` receives the 1-based attempt number and should open the target
/// and run its liveness probe. A policy with zero attempts still tries once.
pub async fn wait_until_ready<T, F, Fut>(
    target: &str,
    address: &str,
    policy: RetryPolicy,
    mut attempt: F,
) -> Result<T, BootstrapError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let max_attempts = policy.attempts.max(1);
    let mut counter = 0;

    loop {
        counter += 1;

        match attempt(counter).await {
            Ok(handle) => {
                info!(store = target, address, attempts = counter, "Connected to {}", target);
                return Ok(handle);
            }
            Err(e) => {
                error!(
                    store = target,
                    address,
                    attempt = counter,
                    error = %e,
                    "Cannot connect to {}", target
                );

                if counter >= max_attempts {
                    return Err(BootstrapError::Exhausted {
                        target: target.to_string(),
                        address: address.to_string(),
                        attempts: counter,
                        source: e,
                    });
                }
            }
        }

        tokio::time::sleep(policy.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    const INTERVAL: Duration = Duration::from_secs(5);

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_last_allowed_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let handle = wait_until_ready("redis", "localhost:6379", RetryPolicy::new(4, INTERVAL), {
            let calls = calls.clone();
            move |n| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 4 {
                        Err(StoreError::Connection("refused".to_string()))
                    } else {
                        Ok("handle")
                    }
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(handle, "handle");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(started.elapsed(), INTERVAL * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_after_exact_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let result: Result<(), _> =
            wait_until_ready("postgres", "db:5432", RetryPolicy::new(3, INTERVAL), {
                let calls = calls.clone();
                move |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(StoreError::Timeout(Duration::from_secs(1))) }
                }
            })
            .await;

        let BootstrapError::Exhausted {
            target,
            address,
            attempts,
            source,
        } = result.unwrap_err();
        assert_eq!(target, "postgres");
        assert_eq!(address, "db:5432");
        assert_eq!(attempts, 3);
        assert_eq!(source, StoreError::Timeout(Duration::from_secs(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // No wait after the final failure
        assert_eq!(started.elapsed(), INTERVAL * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_success_does_not_wait() {
        let started = Instant::now();
        let value = wait_until_ready("redis", "r:6379", RetryPolicy::new(12, INTERVAL), |_| async {
            Ok(7)
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_tries_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<(), _> = wait_until_ready("redis", "r:6379", RetryPolicy::new(0, INTERVAL), {
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(StoreError::Closed) }
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
