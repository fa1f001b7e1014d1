//! Request interceptors wrapping protected routes
//!
//! `require_auth` establishes the caller, `lock_dimensions` serializes
//! concurrent writes to the same resource dimensions of that caller.

pub mod auth;
pub mod lock;

pub use auth::require_auth;
pub use lock::lock_dimensions;
