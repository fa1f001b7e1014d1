//! Advisory resource locks over a shared coordination store
//!
//! A request that mutates one or more resource dimensions of a principal
//! first acquires one lock record per dimension, keyed `dimension:principal`.
//! Acquisition is all-or-nothing: on contention or store failure every key
//! taken so far is released before the error is returned. The downstream
//! handler runs only with every key held, and the keys are released once it
//! finishes whatever it returns.
//!
//! Locks are advisory and not re-entrant. A key held by anyone, including the
//! same principal earlier in the call chain, is contention.

use crate::ports::CoordinationStore;
use crate::{Error, LockReleaseError, Result};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use usermeta_types::Principal;

#[derive(Clone)]
pub struct LockCoordinator {
    store: Arc<dyn CoordinationStore>,
    ttl: Duration,
}

impl LockCoordinator {
    pub fn new(store: Arc<dyn CoordinationStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Key of the lock guarding `dimension` for `principal`
    pub fn lock_key(dimension: &str, principal: &Principal) -> String {
        format!("{}:{}", dimension, principal)
    }

    /// Run `next` while holding a lock on every dimension for `principal`.
    ///
    /// Returns `Error::Conflict` without running `next` if any dimension is
    /// already locked, and `Error::Infrastructure` if the store fails during
    /// acquisition. Release failures after `next` completes are logged and do
    /// not change the returned value.
    pub async fn guard<I, S, F, Fut, T>(
        &self,
        principal: Principal,
        dimensions: I,
        next: F,
    ) -> Result<T>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut locks = self.acquire(principal, dimensions).await?;

        // A panic or cancellation here drops `locks`, which releases in the background
        let output = next().await;

        locks.release_all().await;

        Ok(output)
    }

    /// Acquire every dimension for `principal`, or none of them.
    ///
    /// Dimensions are tried in the order given, duplicates collapsed, and the
    /// first contended key stops the attempt without probing the rest.
    pub async fn acquire<I, S>(&self, principal: Principal, dimensions: I) -> Result<LockSet>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut locks = LockSet::new(self.store.clone());
        let value = principal.to_string();
        let mut seen = HashSet::new();

        for dimension in dimensions {
            let dimension = dimension.as_ref();
            if !seen.insert(dimension.to_string()) {
                continue;
            }

            let key = Self::lock_key(dimension, &principal);
            match self.store.set_if_absent(&key, &value, self.ttl).await {
                Ok(true) => {
                    debug!(key = %key, "Lock acquired");
                    locks.track(key);
                }
                Ok(false) => {
                    warn!(key = %key, "Resource is locked by another request");
                    locks.release_all().await;
                    return Err(Error::Conflict { key });
                }
                Err(e) => {
                    error!(key = %key, error = %e, "Lock acquisition failed");
                    locks.release_all().await;
                    return Err(Error::Infrastructure(e));
                }
            }
        }

        Ok(locks)
    }
}

/// Outcome of releasing a [`LockSet`]
#[derive(Debug, Default)]
pub struct ReleaseReport {
    pub released: Vec<String>,
    pub failed: Vec<LockReleaseError>,
}

impl ReleaseReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Keys held by one request.
///
/// Anything still held when the set is dropped is released on a background
/// task, so a cancelled or panicking request leaks a lock for at most its TTL.
pub struct LockSet {
    store: Arc<dyn CoordinationStore>,
    keys: Vec<String>,
}

impl LockSet {
    fn new(store: Arc<dyn CoordinationStore>) -> Self {
        Self {
            store,
            keys: Vec::new(),
        }
    }

    fn track(&mut self, key: String) {
        self.keys.push(key);
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Delete every held key, best effort. Failed keys are left to TTL expiry.
    pub async fn release_all(&mut self) -> ReleaseReport {
        let keys = std::mem::take(&mut self.keys);
        let mut report = ReleaseReport::default();

        for key in keys {
            match self.store.delete(&key).await {
                Ok(()) => {
                    debug!(key = %key, "Lock released");
                    report.released.push(key);
                }
                Err(e) => {
                    error!(key = %key, error = %e, "Lock release failed, waiting for TTL expiry");
                    report.failed.push(LockReleaseError { key, source: e });
                }
            }
        }

        report
    }
}

impl Drop for LockSet {
    fn drop(&mut self) {
        if self.keys.is_empty() {
            return;
        }

        let keys = std::mem::take(&mut self.keys);
        let store = self.store.clone();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    for key in keys {
                        match store.delete(&key).await {
                            Ok(()) => debug!(key = %key, "Abandoned lock released"),
                            Err(e) => error!(
                                key = %key,
                                error = %e,
                                "Abandoned lock release failed, waiting for TTL expiry"
                            ),
                        }
                    }
                });
            }
            Err(_) => {
                warn!(
                    count = keys.len(),
                    "No runtime to release abandoned locks, waiting for TTL expiry"
                );
            }
        }
    }
}
