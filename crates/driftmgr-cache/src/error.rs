//! Cache errors. L2/backfill failures are logged by the caller and do
//! not fail the read/write path — there is deliberately no "remote
//! unavailable" variant here.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A key failed to (de)serialize for L2 storage.
    Serialization(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Serialization(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for CacheError {}
