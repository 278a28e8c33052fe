//! Admission configuration loading.

use quotagate_types::{ConfigError, GateConfig};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "quotagate.json";
const CONFIG_ENV: &str = "QUOTAGATE_CONFIG";

/// Config path from `QUOTAGATE_CONFIG`, else `quotagate.json` in the working directory.
pub fn default_config_path() -> PathBuf {
    std::env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE))
}

/// Load and validate configuration. A missing file yields validated defaults.
pub fn load_config(path: &Path) -> Result<GateConfig, ConfigError> {
    if !path.exists() {
        tracing::info!("No config at {}, using defaults", path.display());
        return Ok(GateConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| ConfigError::read(path, &e))?;
    let config: GateConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::from_json_error(&e))?;
    config.validate_all()?;

    tracing::debug!(
        "Loaded config from {} ({} providers)",
        path.display(),
        config.providers.len()
    );
    Ok(config)
}

/// Validate and atomically write configuration.
pub fn save_config(path: &Path, config: &GateConfig) -> Result<(), ConfigError> {
    config.validate_all()?;

    let content =
        serde_json::to_string_pretty(config).map_err(|e| ConfigError::from_json_error(&e))?;
    let temp_path = path.with_extension("json.tmp");

    // Atomic write
    fs::write(&temp_path, content).map_err(|e| ConfigError::write(&temp_path, &e))?;
    fs::rename(&temp_path, path).map_err(|e| ConfigError::write(path, &e))
}

/// Load, apply `updater`, and save.
pub fn update_config<F>(path: &Path, updater: F) -> Result<GateConfig, ConfigError>
where
    F: FnOnce(&mut GateConfig),
{
    let mut config = load_config(path)?;
    updater(&mut config);
    save_config(path, &config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotagate_types::{ModelFallbackConfig, ProviderLimitsConfig};

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, GateConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotagate.json");

        let updated = update_config(&path, |config| {
            config.providers.insert("claude".into(), ProviderLimitsConfig::per_minute(30));
            config.models = Some(ModelFallbackConfig::new("opus", "sonnet"));
        })
        .unwrap();

        let reloaded = load_config(&path).unwrap();
        assert_eq!(reloaded, updated);
        assert_eq!(reloaded.providers["claude"].per_minute, 30);
        assert!(!dir.path().join("quotagate.json.tmp").exists());
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(
            &path,
            r#"{"providers": {"p": {"per_minute": 5, "warning_threshold": 0.9, "throttled_threshold": 0.5}}}"#,
        )
        .unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::ValidationError { .. })));

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_save_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotagate.json");
        let mut config = GateConfig::default();
        config.models = Some(ModelFallbackConfig::new("same", "same"));
        assert!(save_config(&path, &config).is_err());
        assert!(!path.exists());
    }
}
