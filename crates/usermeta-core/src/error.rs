//! Error types for Usermeta

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum Error {
    /// Credential missing, malformed, signature-invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A resource dimension is already locked by an in-flight request
    #[error("Resource is locked: {key}")]
    Conflict { key: String },

    #[error("Infrastructure error: {0}")]
    Infrastructure(#[from] StoreError),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error("Token error: {0}")]
    Token(String),
}

impl Error {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Error::Unauthorized(message.into())
    }
}

/// Failures talking to the coordination or relational store.
///
/// Distinct from "key already present", which is an `Ok(false)` outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Store is closed")]
    Closed,

    #[error("Backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("cannot connect to {target} at {address} after {attempts} attempts: {source}")]
    Exhausted {
        target: String,
        address: String,
        attempts: u32,
        #[source]
        source: StoreError,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to release lock {key}: {source}")]
pub struct LockReleaseError {
    pub key: String,
    #[source]
    pub source: StoreError,
}
