//! Typed error definitions for quotagate.
//!
//! Admission denials are not errors: they travel as result values
//! (`RateLimitStatus`, `UserRateLimitResult`). The types here cover the
//! two genuine failure domains, invalid configuration and counter storage.

mod config;
mod store;

pub use config::ConfigError;
pub use store::StoreError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type that wraps all domain-specific errors.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "domain", content = "error")]
pub enum GateError {
    /// Wraps a configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Wraps a counter store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl GateError {
    /// Whether retrying the same operation later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Config(_) => false,
            Self::Store(e) => e.is_transient(),
        }
    }
}

/// Standard Result type using GateError.
pub type Result<T> = std::result::Result<T, GateError>;
