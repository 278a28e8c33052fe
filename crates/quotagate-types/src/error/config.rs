//! Errors from admission limit configuration.
//!
//! Invalid limits are rejected when a manager is built or a config file is
//! loaded or saved, never in the middle of an admission check.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ConfigError {
    /// Limits file exists but could not be read
    #[error("Cannot read limits file {path}: {message}")]
    ReadError { path: String, message: String },

    /// Limits file is not valid JSON for `GateConfig`
    #[error("Invalid limits file: {message}")]
    ParseError { message: String },

    /// A limit, threshold or model setting is out of range or inconsistent.
    /// `field` is a dotted path such as `providers.claude.warning_threshold`.
    #[error("Invalid setting {field}: {message}")]
    ValidationError { field: String, message: String },

    /// Limits file could not be written
    #[error("Cannot write limits file {path}: {message}")]
    WriteError { path: String, message: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError { field: field.into(), message: message.into() }
    }

    pub fn from_json_error(e: &serde_json::Error) -> Self {
        Self::ParseError { message: e.to_string() }
    }

    pub fn read(path: &Path, e: &std::io::Error) -> Self {
        Self::ReadError { path: path.display().to_string(), message: e.to_string() }
    }

    pub fn write(path: &Path, e: &std::io::Error) -> Self {
        Self::WriteError { path: path.display().to_string(), message: e.to_string() }
    }

    /// Offending setting, for validation failures.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::ValidationError { field, .. } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_setting() {
        let err = ConfigError::invalid("users.per_minute", "limit 500 exceeds the maximum of 100");
        assert_eq!(err.field(), Some("users.per_minute"));
        assert_eq!(
            err.to_string(),
            "Invalid setting users.per_minute: limit 500 exceeds the maximum of 100"
        );
    }

    #[test]
    fn test_io_errors_carry_path() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ConfigError::write(Path::new("/etc/quotagate.json"), &io);
        assert!(err.to_string().starts_with("Cannot write limits file /etc/quotagate.json"));
        assert_eq!(err.field(), None);
    }
}
