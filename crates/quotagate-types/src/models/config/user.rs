//! Per-user limits.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validation_error;
use crate::error::ConfigError;
use crate::models::TimeWindow;

/// Safety ceilings for per-user limits.
pub const MAX_REQUESTS_PER_MINUTE: u32 = 100;
pub const MAX_REQUESTS_PER_HOUR: u32 = 1_000;
pub const MAX_REQUESTS_PER_DAY: u32 = 10_000;

/// Per-user request limits applied before any backend call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct UserLimitsConfig {
    /// Disable to admit every user unconditionally
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[validate(range(min = 1_u32, max = 100_u32))]
    #[serde(default = "default_per_minute")]
    pub per_minute: u32,
    #[validate(range(min = 1_u32, max = 1000_u32))]
    #[serde(default = "default_per_hour")]
    pub per_hour: u32,
    #[validate(range(min = 1_u32, max = 10000_u32))]
    #[serde(default = "default_per_day")]
    pub per_day: u32,
    /// Timeout applied to every counter store call, in seconds
    #[validate(range(min = 1_u64, max = 30_u64))]
    #[serde(default = "default_store_timeout")]
    pub store_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_per_minute() -> u32 {
    5
}

fn default_per_hour() -> u32 {
    60
}

fn default_per_day() -> u32 {
    500
}

fn default_store_timeout() -> u64 {
    3
}

impl Default for UserLimitsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_minute: default_per_minute(),
            per_hour: default_per_hour(),
            per_day: default_per_day(),
            store_timeout_secs: default_store_timeout(),
        }
    }
}

impl UserLimitsConfig {
    pub fn new(per_minute: u32, per_hour: u32, per_day: u32) -> Self {
        Self { per_minute, per_hour, per_day, ..Self::default() }
    }

    /// Range checks on every setting, including the per-window ceilings.
    pub fn validate_settings(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|e| validation_error(&e))
    }

    pub fn limit_for(&self, window: TimeWindow) -> u32 {
        match window {
            TimeWindow::Minute => self.per_minute,
            TimeWindow::Hour => self.per_hour,
            TimeWindow::Day => self.per_day,
        }
    }
}
