//! Configuration models.

mod model;
mod provider;
mod user;

pub use model::ModelFallbackConfig;
pub use provider::ProviderLimitsConfig;
pub use user::{
    UserLimitsConfig, MAX_REQUESTS_PER_DAY, MAX_REQUESTS_PER_HOUR, MAX_REQUESTS_PER_MINUTE,
};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::ValidationErrors;

use crate::error::ConfigError;

/// Top-level admission configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GateConfig {
    /// Provider ID to provider limits
    #[serde(default)]
    pub providers: HashMap<String, ProviderLimitsConfig>,
    /// Per-user limits
    #[serde(default)]
    pub users: UserLimitsConfig,
    /// Primary/fallback model pair, if the backend supports fallback
    #[serde(default)]
    pub models: Option<ModelFallbackConfig>,
}

impl GateConfig {
    /// Validate every section, failing on the first invalid one.
    pub fn validate_all(&self) -> Result<(), ConfigError> {
        for (provider, limits) in &self.providers {
            limits.validate_limits().map_err(|e| match e {
                ConfigError::ValidationError { field, message } => ConfigError::ValidationError {
                    field: format!("providers.{}.{}", provider, field),
                    message,
                },
                other => other,
            })?;
        }
        self.users.validate_settings()?;
        if let Some(models) = &self.models {
            models.validate_models()?;
        }
        Ok(())
    }
}

/// Collapse validator output into a single `ConfigError`.
pub(crate) fn validation_error(errs: &ValidationErrors) -> ConfigError {
    let field = errs
        .field_errors()
        .keys()
        .next()
        .map(|k| k.to_string())
        .unwrap_or_else(|| "config".to_string());
    ConfigError::invalid(field, errs.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(GateConfig::default().validate_all().is_ok());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let json = r#"{
            "providers": { "claude": { "per_minute": 4, "warning_threshold": 0.75, "throttled_threshold": 1.0 } },
            "users": { "per_minute": 3 }
        }"#;
        let config: GateConfig = serde_json::from_str(json).unwrap();
        let claude = &config.providers["claude"];
        assert_eq!(claude.per_minute, 4);
        assert_eq!(claude.per_hour, 0);
        assert_eq!(config.users.per_minute, 3);
        assert_eq!(config.users.per_hour, 60);
        assert!(config.validate_all().is_ok());
    }

    #[test]
    fn test_invalid_provider_names_field() {
        let mut config = GateConfig::default();
        config.providers.insert(
            "gemini".into(),
            ProviderLimitsConfig { warning_threshold: 0.9, throttled_threshold: 0.8, ..Default::default() },
        );
        let err = config.validate_all().unwrap_err();
        assert!(err.to_string().contains("providers.gemini"));
    }

    #[test]
    fn test_user_ceiling_rejected_on_load_path() {
        let json = r#"{ "users": { "per_minute": 500, "per_hour": 1000, "per_day": 10000 } }"#;
        let config: GateConfig = serde_json::from_str(json).unwrap();
        assert!(matches!(
            config.validate_all(),
            Err(ConfigError::ValidationError { ref field, .. }) if field == "per_minute"
        ));
    }
}
