//! Usermeta Core Library
//!
//! Caller identity verification, advisory resource locking over a shared
//! coordination store, and bounded startup retries for dependent stores.

// Re-export pure types from usermeta-types
pub use usermeta_types::*;

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod lock;
pub mod ports;
pub mod store;

pub use auth::TokenService;
pub use bootstrap::{wait_until_ready, RetryPolicy};
pub use error::{BootstrapError, Error, LockReleaseError, Result, StoreError, StoreResult};
pub use lock::{LockCoordinator, LockSet, ReleaseReport};
pub use ports::{CoordinationStore, UserStore};
pub use store::MemoryStore;
