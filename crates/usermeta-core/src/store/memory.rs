//! In-process coordination store using DashMap
//!
//! Honors the same contract as the Redis adapter within one process: atomic
//! set-if-absent through the map's entry API, TTL expiry, and explicit close.
//! Faults can be injected per operation to exercise infrastructure errors.

use crate::ports::CoordinationStore;
use crate::{StoreError, StoreResult};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub struct MemoryStore {
    data: Arc<DashMap<String, Record>>,
    closed: AtomicBool,
    set_faults: AtomicU32,
    delete_faults: AtomicU32,
    ping_faults: AtomicU32,
}

struct Record {
    value: String,
    expires_at: Instant,
}

impl Record {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let store = Self {
            data: Arc::new(DashMap::new()),
            closed: AtomicBool::new(false),
            set_faults: AtomicU32::new(0),
            delete_faults: AtomicU32::new(0),
            ping_faults: AtomicU32::new(0),
        };

        store.start_sweeper();

        store
    }

    /// Live value stored under `key`
    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.data
            .get(key)
            .filter(|record| record.is_live(now))
            .map(|record| record.value.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.data.iter().filter(|r| r.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the next `n` `set_if_absent` calls fail with a connection error
    pub fn fail_next_sets(&self, n: u32) {
        self.set_faults.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` `delete` calls fail with a connection error
    pub fn fail_next_deletes(&self, n: u32) {
        self.delete_faults.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` `ping` calls fail with a connection error
    pub fn fail_next_pings(&self, n: u32) {
        self.ping_faults.store(n, Ordering::SeqCst);
    }

    fn check(&self, faults: &AtomicU32, op: &str) -> StoreResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }

        let injected = faults
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Connection(format!("injected {} failure", op)));
        }

        Ok(())
    }

    fn start_sweeper(&self) {
        // Outside a runtime, expired records are still ignored on read
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let data = Arc::downgrade(&self.data);
        handle.spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;

                let Some(data) = data.upgrade() else {
                    break;
                };
                let now = Instant::now();
                data.retain(|_, record| record.is_live(now));
            }
        });
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoordinationStore for MemoryStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        self.check(&self.set_faults, "set")?;

        let now = Instant::now();
        let record = Record {
            value: value.to_string(),
            expires_at: now + ttl,
        };

        // The entry guard holds the shard lock across check and insert
        match self.data.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_live(now) {
                    Ok(false)
                } else {
                    entry.insert(record);
                    Ok(true)
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(record);
                Ok(true)
            }
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.check(&self.delete_faults, "delete")?;
        self.data.remove(key);
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check(&self.ping_faults, "ping")
    }

    async fn close(&self) -> StoreResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        self.data.clear();
        Ok(())
    }
}
