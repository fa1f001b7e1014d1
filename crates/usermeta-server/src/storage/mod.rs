//! Storage layer
//!
//! Postgres (sqlx) for users and metadata, Redis for lock records.
//! In-memory user store for tests and local runs.

pub mod db;
pub mod memory;
pub mod redis;

pub use db::Database;
pub use memory::MemoryUserStore;
pub use redis::RedisStore;
