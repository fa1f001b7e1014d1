//! Port traits (interfaces) for dependency injection

pub mod coordination;
pub mod storage;

pub use coordination::CoordinationStore;
pub use storage::UserStore;
