//! Per-user limit sanity checks.

pub use quotagate_types::models::config::{
    MAX_REQUESTS_PER_DAY, MAX_REQUESTS_PER_HOUR, MAX_REQUESTS_PER_MINUTE,
};
use quotagate_types::ConfigError;

/// Reject limits outside the safety ceilings; return warnings for
/// combinations where one window shadows or can never reach another.
pub fn validate_rate_limit_configuration(
    per_minute: u32,
    per_hour: u32,
    per_day: u32,
) -> Result<Vec<String>, ConfigError> {
    for (field, value, max) in [
        ("per_minute", per_minute, MAX_REQUESTS_PER_MINUTE),
        ("per_hour", per_hour, MAX_REQUESTS_PER_HOUR),
        ("per_day", per_day, MAX_REQUESTS_PER_DAY),
    ] {
        if value == 0 {
            return Err(ConfigError::invalid(field, "limit must be at least 1"));
        }
        if value > max {
            return Err(ConfigError::invalid(
                field,
                format!("limit {} exceeds the maximum of {}", value, max),
            ));
        }
    }

    let mut warnings = Vec::new();
    if per_hour < per_minute {
        warnings.push(format!(
            "hourly limit ({}) is below the per-minute limit ({}); the minute limit can never be reached",
            per_hour, per_minute
        ));
    } else if u64::from(per_hour) > u64::from(per_minute) * 60 {
        warnings.push(format!(
            "hourly limit ({}) exceeds per-minute limit x 60 ({}); it can never be reached",
            per_hour,
            u64::from(per_minute) * 60
        ));
    }
    if per_day < per_hour {
        warnings.push(format!(
            "daily limit ({}) is below the hourly limit ({}); the hourly limit can never be reached",
            per_day, per_hour
        ));
    } else if u64::from(per_day) > u64::from(per_hour) * 24 {
        warnings.push(format!(
            "daily limit ({}) exceeds hourly limit x 24 ({}); it can never be reached",
            per_day,
            u64::from(per_hour) * 24
        ));
    }

    for warning in &warnings {
        tracing::warn!("User rate limit configuration: {}", warning);
    }
    Ok(warnings)
}
