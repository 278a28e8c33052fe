//! Primary/fallback model pair.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validation_error;
use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct ModelFallbackConfig {
    #[validate(length(min = 1_u64))]
    pub primary_model: String,
    #[validate(length(min = 1_u64))]
    pub fallback_model: String,
    /// How long an ordinary rate limit keeps a model unavailable
    #[validate(range(min = 1_u64, max = 86400_u64))]
    #[serde(default = "default_cooldown")]
    pub rate_limit_cooldown_secs: u64,
}

fn default_cooldown() -> u64 {
    60
}

impl ModelFallbackConfig {
    pub fn new(primary: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            primary_model: primary.into(),
            fallback_model: fallback.into(),
            rate_limit_cooldown_secs: default_cooldown(),
        }
    }

    pub fn validate_models(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|e| validation_error(&e))?;
        if self.primary_model == self.fallback_model {
            return Err(ConfigError::invalid(
                "fallback_model",
                "fallback model must differ from the primary model",
            ));
        }
        Ok(())
    }
}
