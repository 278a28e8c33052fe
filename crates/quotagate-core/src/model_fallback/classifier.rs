//! Backend error text classification.
//!
//! All substring rules live here. Matching is case-insensitive.

use regex::Regex;
use std::sync::OnceLock;

use super::types::ModelErrorKind;

const RATE_LIMIT_PATTERNS: &[&str] = &[
    "rate limit",
    "rate-limit",
    "rate_limit",
    "ratelimit",
    "too many requests",
    "429",
    "throttl",
    "request limit",
    "requests per",
    "quota exceeded",
    "exceeded your quota",
    "resource exhausted",
    "resource_exhausted",
    "usage limit",
];

const DAILY_PATTERNS: &[&str] = &["daily", "per day", "/day", "24 hour", "24-hour", "today"];

static RETRY_M_S_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static RETRY_S_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

fn retry_m_s_regex() -> Option<&'static Regex> {
    RETRY_M_S_REGEX
        .get_or_init(|| Regex::new(r"(?i)try again in (\d+)\s*m(?:in(?:ute)?s?)?\s*(\d+)\s*s").ok())
        .as_ref()
}

fn retry_s_regex() -> Option<&'static Regex> {
    RETRY_S_REGEX
        .get_or_init(|| {
            Regex::new(r"(?i)(?:try again in|retry after|retry in|wait)\s*(\d+)\s*(?:s\b|sec|second)").ok()
        })
        .as_ref()
}

/// Whether `error_text` describes throttling rather than an ordinary failure.
pub fn is_model_rate_limited(error_text: &str) -> bool {
    let lower = error_text.to_lowercase();
    RATE_LIMIT_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}

/// Whether `error_text` is a rate limit that references a daily window.
pub fn is_daily_quota_error(error_text: &str) -> bool {
    if !is_model_rate_limited(error_text) {
        return false;
    }
    let lower = error_text.to_lowercase();
    DAILY_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}

pub fn classify_model_error(error_text: &str) -> Option<ModelErrorKind> {
    if is_daily_quota_error(error_text) {
        Some(ModelErrorKind::DailyQuota)
    } else if is_model_rate_limited(error_text) {
        Some(ModelErrorKind::RateLimited)
    } else {
        None
    }
}

/// Retry delay in seconds advertised in the error text, if any.
pub fn parse_retry_hint(error_text: &str) -> Option<u64> {
    if let Some(caps) = retry_m_s_regex().and_then(|re| re.captures(error_text)) {
        if let (Ok(m), Ok(s)) = (caps[1].parse::<u64>(), caps[2].parse::<u64>()) {
            // Backend text is untrusted; absurd values are treated as no hint
            return m.checked_mul(60).and_then(|v| v.checked_add(s));
        }
    }

    if let Some(caps) = retry_s_regex().and_then(|re| re.captures(error_text)) {
        if let Ok(s) = caps[1].parse::<u64>() {
            return Some(s);
        }
    }

    None
}
