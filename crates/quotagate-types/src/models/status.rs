//! Provider rate limit status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Derived admission status of a provider. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RateLimitStatus {
    Normal,
    Warning,
    Throttled,
    #[serde(rename = "Quota Exhausted")]
    QuotaExhausted,
}

impl RateLimitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Warning => "Warning",
            Self::Throttled => "Throttled",
            Self::QuotaExhausted => "Quota Exhausted",
        }
    }

    /// Whether calls should still be attempted in this status.
    pub fn admits_calls(&self) -> bool {
        matches!(self, Self::Normal | Self::Warning)
    }
}

impl fmt::Display for RateLimitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A debounced status transition delivered to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub provider: String,
    pub previous: RateLimitStatus,
    pub status: RateLimitStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        assert_eq!(RateLimitStatus::Normal.to_string(), "Normal");
        assert_eq!(RateLimitStatus::Warning.to_string(), "Warning");
        assert_eq!(RateLimitStatus::Throttled.to_string(), "Throttled");
        assert_eq!(RateLimitStatus::QuotaExhausted.to_string(), "Quota Exhausted");
    }

    #[test]
    fn test_admits_calls() {
        assert!(RateLimitStatus::Normal.admits_calls());
        assert!(RateLimitStatus::Warning.admits_calls());
        assert!(!RateLimitStatus::Throttled.admits_calls());
        assert!(!RateLimitStatus::QuotaExhausted.admits_calls());
    }
}
