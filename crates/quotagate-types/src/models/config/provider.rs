//! Provider-level limits.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validation_error;
use crate::error::ConfigError;
use crate::models::TimeWindow;

/// Per-provider call limits and status thresholds.
///
/// A window limit of 0 leaves that window unconfigured.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Validate)]
pub struct ProviderLimitsConfig {
    #[serde(default)]
    pub per_minute: u32,
    #[serde(default)]
    pub per_hour: u32,
    #[serde(default)]
    pub per_day: u32,
    /// Utilization ratio at which status becomes Warning
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: f64,
    /// Utilization ratio at which status becomes Throttled
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    #[serde(default = "default_throttled_threshold")]
    pub throttled_threshold: f64,
}

fn default_warning_threshold() -> f64 {
    0.75
}

fn default_throttled_threshold() -> f64 {
    0.9
}

impl Default for ProviderLimitsConfig {
    fn default() -> Self {
        Self {
            per_minute: 0,
            per_hour: 0,
            per_day: 0,
            warning_threshold: default_warning_threshold(),
            throttled_threshold: default_throttled_threshold(),
        }
    }
}

impl ProviderLimitsConfig {
    pub fn per_minute(limit: u32) -> Self {
        Self { per_minute: limit, ..Self::default() }
    }

    pub fn with_thresholds(mut self, warning: f64, throttled: f64) -> Self {
        self.warning_threshold = warning;
        self.throttled_threshold = throttled;
        self
    }

    pub fn limit_for(&self, window: TimeWindow) -> u32 {
        match window {
            TimeWindow::Minute => self.per_minute,
            TimeWindow::Hour => self.per_hour,
            TimeWindow::Day => self.per_day,
        }
    }

    /// Range checks plus the warning < throttled ordering.
    pub fn validate_limits(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|e| validation_error(&e))?;
        if self.warning_threshold >= self.throttled_threshold {
            return Err(ConfigError::invalid(
                "warning_threshold",
                format!(
                    "warning threshold {} must be below throttled threshold {}",
                    self.warning_threshold, self.throttled_threshold
                ),
            ));
        }
        Ok(())
    }
}
