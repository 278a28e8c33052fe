//! Per-user rate limit records and check results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::window::TimeWindow;

/// Persisted counter for one (user, window) pair.
///
/// A record covers exactly one window instance; once "now" moves into a
/// new instance the record is superseded rather than accumulated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRateLimitRecord {
    pub user_id: String,
    pub window: TimeWindow,
    pub request_count: u32,
    /// Window instance start, epoch seconds
    pub window_start: i64,
    /// Last recorded request, epoch seconds
    pub last_request: i64,
}

impl UserRateLimitRecord {
    /// Fresh record holding the first request of a window instance.
    pub fn first_request(user_id: &str, window: TimeWindow, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            window,
            request_count: 1,
            window_start: window.window_start(now).timestamp(),
            last_request: now.timestamp(),
        }
    }

    /// Whether this record counts toward the window instance containing `now`.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.window_start == self.window.window_start(now).timestamp()
    }

    /// Request count attributable to the window instance containing `now`.
    pub fn count_at(&self, now: DateTime<Utc>) -> u32 {
        if self.is_current(now) {
            self.request_count
        } else {
            0
        }
    }
}

/// Platform context of a request, used for admin bypass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildContext {
    /// Role IDs held by the requesting member
    pub role_ids: Vec<String>,
    /// Role ID to role name for the guild
    pub role_names: HashMap<String, String>,
}

impl GuildContext {
    pub fn new(role_ids: Vec<String>, role_names: HashMap<String, String>) -> Self {
        Self { role_ids, role_names }
    }
}

/// Outcome of a per-user admission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRateLimitResult {
    pub allowed: bool,
    /// Allowed because the user holds an admin role
    #[serde(default)]
    pub bypassed: bool,
    /// First exceeded window, when denied
    pub exceeded_window: Option<TimeWindow>,
    pub current_count: u32,
    pub window_limit: u32,
    pub remaining: u32,
    pub reset_at: Option<DateTime<Utc>>,
    /// Ready-to-display denial message
    pub message: Option<String>,
}

impl UserRateLimitResult {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            bypassed: false,
            exceeded_window: None,
            current_count: 0,
            window_limit: 0,
            remaining: 0,
            reset_at: None,
            message: None,
        }
    }

    pub fn bypassed() -> Self {
        Self { bypassed: true, ..Self::allowed() }
    }

    pub fn denied(
        window: TimeWindow,
        current_count: u32,
        window_limit: u32,
        reset_at: DateTime<Utc>,
        message: String,
    ) -> Self {
        Self {
            allowed: false,
            bypassed: false,
            exceeded_window: Some(window),
            current_count,
            window_limit,
            remaining: window_limit.saturating_sub(current_count),
            reset_at: Some(reset_at),
            message: Some(message),
        }
    }
}

/// Current usage of one window, for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowUsage {
    pub window: TimeWindow,
    pub count: u32,
    pub limit: u32,
    pub resets_at: DateTime<Utc>,
}
