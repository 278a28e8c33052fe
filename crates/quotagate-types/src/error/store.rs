//! Counter store errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by a persisted counter store.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum StoreError {
    /// Underlying database failed
    #[error("Database error: {0}")]
    Database(String),

    /// Store call did not complete within the configured timeout
    #[error("Store operation '{operation}' timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    /// Stored value could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Timeouts and database hiccups may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Timeout { .. })
    }
}
