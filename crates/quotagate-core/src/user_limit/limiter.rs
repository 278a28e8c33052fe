//! Per-user limiter backed by a counter store.

use chrono::{DateTime, Duration as TimeDelta, Utc};
use quotagate_types::{
    format_wait_time, ConfigError, GateError, GuildContext, StoreError, TimeWindow,
    UserLimitsConfig, UserRateLimitRecord, UserRateLimitResult, WindowUsage,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::admin::{parse_admin_role_names, roles_grant_bypass, ADMIN_ROLE_NAMES_KEY};
use super::validation::validate_rate_limit_configuration;
use crate::clock::{Clock, SystemClock};
use crate::modules::store::{CounterStore, StoreResult};

/// Records untouched for this long are removed by `cleanup_expired_rate_limits`.
pub const RATE_LIMIT_RETENTION_DAYS: i64 = 7;

const STORE_UNAVAILABLE_MESSAGE: &str =
    "Rate limiting is temporarily unavailable. Please try again shortly.";

pub struct UserRateLimiter {
    store: Arc<dyn CounterStore>,
    config: UserLimitsConfig,
    clock: Arc<dyn Clock>,
}

fn denial_message(window: TimeWindow, limit: u32, wait: Duration) -> String {
    format!(
        "You've reached the limit of {} requests per {}. Please try again in {}.",
        limit,
        window,
        format_wait_time(wait)
    )
}

impl UserRateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: UserLimitsConfig) -> Result<Self, ConfigError> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Validates `config`; out-of-range limits are rejected, inconsistent ones logged.
    pub fn with_clock(
        store: Arc<dyn CounterStore>,
        config: UserLimitsConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate_settings()?;
        validate_rate_limit_configuration(config.per_minute, config.per_hour, config.per_day)?;
        Ok(Self { store, config, clock })
    }

    pub fn config(&self) -> &UserLimitsConfig {
        &self.config
    }

    async fn timed<T, F>(&self, operation: &str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        let secs = self.config.store_timeout_secs;
        match tokio::time::timeout(Duration::from_secs(secs), fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout { operation: operation.to_string(), secs }),
        }
    }

    /// Check every window, most restrictive first.
    ///
    /// Store failures surface as `Err`; see `is_user_allowed` for the
    /// fail-closed variant.
    pub async fn check_user_rate_limit(
        &self,
        user_id: &str,
        guild: Option<&GuildContext>,
    ) -> Result<UserRateLimitResult, GateError> {
        self.evaluate(user_id, guild).await.map_err(|(_, e)| e.into())
    }

    /// Like `check_user_rate_limit`, but a window whose record cannot be read
    /// is treated as exceeded. Other windows and users are unaffected.
    pub async fn is_user_allowed(
        &self,
        user_id: &str,
        guild: Option<&GuildContext>,
    ) -> UserRateLimitResult {
        match self.evaluate(user_id, guild).await {
            Ok(result) => result,
            Err((window, e)) => {
                tracing::error!(
                    "Failed to read {} limit for user {}, denying: {}",
                    window,
                    user_id,
                    e
                );
                UserRateLimitResult::denied(
                    window,
                    0,
                    self.config.limit_for(window),
                    window.window_end(self.clock.now()),
                    STORE_UNAVAILABLE_MESSAGE.to_string(),
                )
            }
        }
    }

    /// Evaluation shared by both checks. A failed read stops evaluation and
    /// reports the window it happened on.
    async fn evaluate(
        &self,
        user_id: &str,
        guild: Option<&GuildContext>,
    ) -> Result<UserRateLimitResult, (TimeWindow, StoreError)> {
        if !self.config.enabled {
            return Ok(UserRateLimitResult::allowed());
        }

        if let Some(guild) = guild {
            match self.check_user_admin_by_roles(&guild.role_ids, &guild.role_names).await {
                Ok(true) => {
                    tracing::debug!("User {} bypasses rate limits via admin role", user_id);
                    return Ok(UserRateLimitResult::bypassed());
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Admin role lookup failed for {}, applying limits: {}", user_id, e);
                }
            }
        }

        let now = self.clock.now();
        let mut result = UserRateLimitResult::allowed();
        let mut min_remaining: Option<u32> = None;

        for window in TimeWindow::ALL {
            let limit = self.config.limit_for(window);
            if limit == 0 {
                continue;
            }

            let record = self
                .timed("get_user_rate_limit", self.store.get_user_rate_limit(user_id, window))
                .await
                .map_err(|e| (window, e))?;

            let count = record.as_ref().map_or(0, |r| r.count_at(now));
            if count >= limit {
                let reset_at = window.window_end(now);
                let wait = (reset_at - now).to_std().unwrap_or_default();
                tracing::info!(
                    "User {} exceeded {} limit ({}/{})",
                    user_id,
                    window,
                    count,
                    limit
                );
                return Ok(UserRateLimitResult::denied(
                    window,
                    count,
                    limit,
                    reset_at,
                    denial_message(window, limit, wait),
                ));
            }

            let remaining = limit - count;
            if min_remaining.map_or(true, |current| remaining < current) {
                min_remaining = Some(remaining);
                result.current_count = count;
                result.window_limit = limit;
            }
        }

        result.remaining = min_remaining.unwrap_or(0);
        Ok(result)
    }

    /// Increment the current window instance of every window.
    ///
    /// Call only after an allowing check. Every window is attempted; the
    /// first failure is returned after the rest have been written.
    pub async fn record_user_request(&self, user_id: &str) -> Result<(), GateError> {
        if !self.config.enabled {
            return Ok(());
        }
        let now = self.clock.now();
        let mut first_error: Option<StoreError> = None;

        for window in TimeWindow::ALL {
            if let Err(e) = self.record_window(user_id, window, now).await {
                tracing::warn!("Failed to record {} request for user {}: {}", window, user_id, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    async fn record_window(
        &self,
        user_id: &str,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let existing = self
            .timed("get_user_rate_limit", self.store.get_user_rate_limit(user_id, window))
            .await?;

        let record = match existing {
            Some(mut record) if record.is_current(now) => {
                record.request_count = record.request_count.saturating_add(1);
                record.last_request = now.timestamp();
                record
            }
            _ => UserRateLimitRecord::first_request(user_id, window, now),
        };

        self.timed("upsert_user_rate_limit", self.store.upsert_user_rate_limit(&record)).await
    }

    /// Whether any of the user's roles is a configured admin role.
    /// No configured admin roles means no bypass for anyone.
    pub async fn check_user_admin_by_roles(
        &self,
        user_roles: &[String],
        role_id_to_name: &HashMap<String, String>,
    ) -> Result<bool, GateError> {
        let configured = self
            .timed("get_configuration", self.store.get_configuration(ADMIN_ROLE_NAMES_KEY))
            .await?;

        let Some(value) = configured else {
            return Ok(false);
        };
        let admin_names = parse_admin_role_names(&value);
        Ok(roles_grant_bypass(&admin_names, user_roles, role_id_to_name))
    }

    /// Administrative reset of one window, or all windows when `window` is `None`.
    pub async fn reset_user_rate_limit(
        &self,
        user_id: &str,
        window: Option<TimeWindow>,
    ) -> Result<u64, GateError> {
        let removed = self
            .timed("reset_user_rate_limit", self.store.reset_user_rate_limit(user_id, window))
            .await?;
        tracing::info!(
            "Reset {} rate limit record(s) for user {} ({})",
            removed,
            user_id,
            window.map_or("all windows", |w| w.as_str())
        );
        Ok(removed)
    }

    /// Remove records untouched for the retention period. Meant for an external scheduler.
    pub async fn cleanup_expired_rate_limits(&self) -> Result<u64, GateError> {
        let older_than = self.clock.now() - TimeDelta::days(RATE_LIMIT_RETENTION_DAYS);
        let removed = self
            .timed(
                "cleanup_expired_user_rate_limits",
                self.store.cleanup_expired_user_rate_limits(older_than),
            )
            .await?;
        if removed > 0 {
            tracing::info!("Cleaned up {} expired user rate limit records", removed);
        }
        Ok(removed)
    }

    /// Current counts per window, for status displays.
    pub async fn get_user_usage(&self, user_id: &str) -> Result<Vec<WindowUsage>, GateError> {
        let now = self.clock.now();
        let mut usage = Vec::with_capacity(TimeWindow::ALL.len());
        for window in TimeWindow::ALL {
            let record = self
                .timed("get_user_rate_limit", self.store.get_user_rate_limit(user_id, window))
                .await?;
            usage.push(WindowUsage {
                window,
                count: record.as_ref().map_or(0, |r| r.count_at(now)),
                limit: self.config.limit_for(window),
                resets_at: window.window_end(now),
            });
        }
        Ok(usage)
    }
}
