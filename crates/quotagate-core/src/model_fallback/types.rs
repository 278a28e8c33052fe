use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a backend error says about a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelErrorKind {
    /// Short-lived throttling; clears after a cooldown
    RateLimited,
    /// Daily allowance used up; clears at the next UTC midnight
    DailyQuota,
}

/// Externally visible availability of one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ModelAvailability {
    Available,
    RateLimited { until: DateTime<Utc> },
    QuotaExhausted { until: DateTime<Utc> },
}

impl ModelAvailability {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    pub fn until(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Available => None,
            Self::RateLimited { until } | Self::QuotaExhausted { until } => Some(*until),
        }
    }
}

impl fmt::Display for ModelAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => f.write_str("Available"),
            Self::RateLimited { .. } => f.write_str("Rate Limited"),
            Self::QuotaExhausted { .. } => f.write_str("Quota Exhausted"),
        }
    }
}

/// Mutable per-model record, guarded by the coordinator's per-model lock.
///
/// Rate-limited and quota-exhausted are kept mutually exclusive.
#[derive(Debug, Clone)]
pub(crate) struct ModelState {
    pub name: String,
    pub rate_limited: bool,
    pub rate_limit_reset_time: Option<DateTime<Utc>>,
    pub quota_exhausted: bool,
    pub quota_reset_time: Option<DateTime<Utc>>,
}

impl ModelState {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rate_limited: false,
            rate_limit_reset_time: None,
            quota_exhausted: false,
            quota_reset_time: None,
        }
    }

    pub fn is_available(&self) -> bool {
        !self.rate_limited && !self.quota_exhausted
    }

    /// Available as of `now`, counting flags whose reset time has passed as cleared.
    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        let expired = |reset: Option<DateTime<Utc>>| reset.map_or(true, |reset| now >= reset);
        (!self.quota_exhausted || expired(self.quota_reset_time))
            && (!self.rate_limited || expired(self.rate_limit_reset_time))
    }

    pub fn availability(&self) -> ModelAvailability {
        match (self.quota_exhausted, self.rate_limited) {
            (true, _) => ModelAvailability::QuotaExhausted {
                until: self.quota_reset_time.unwrap_or(DateTime::<Utc>::MIN_UTC),
            },
            (false, true) => ModelAvailability::RateLimited {
                until: self.rate_limit_reset_time.unwrap_or(DateTime::<Utc>::MIN_UTC),
            },
            (false, false) => ModelAvailability::Available,
        }
    }

    /// Clear flags whose reset time has passed. Returns true if anything changed.
    pub fn restore(&mut self, now: DateTime<Utc>) -> bool {
        let mut changed = false;
        if self.quota_exhausted && self.quota_reset_time.map_or(true, |reset| now >= reset) {
            self.quota_exhausted = false;
            self.quota_reset_time = None;
            changed = true;
        }
        if self.rate_limited && self.rate_limit_reset_time.map_or(true, |reset| now >= reset) {
            self.rate_limited = false;
            self.rate_limit_reset_time = None;
            changed = true;
        }
        changed
    }
}
