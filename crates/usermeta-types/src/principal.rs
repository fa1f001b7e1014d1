//! Caller identity

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Verified identity of the request's caller.
///
/// Only the token verifier produces one; it lives for a single request and
/// is never persisted on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(i64);

impl Principal {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn id(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid principal: {0}")]
pub struct ParsePrincipalError(String);

impl FromStr for Principal {
    type Err = ParsePrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .map(Principal)
            .map_err(|_| ParsePrincipalError(s.to_string()))
    }
}

impl From<i64> for Principal {
    fn from(id: i64) -> Self {
        Self(id)
    }
}
