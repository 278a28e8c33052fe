//! Provider rate limit manager.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use quotagate_types::{
    format_wait_time, next_midnight_utc, ConfigError, GateConfig, ProviderLimitsConfig,
    RateLimitStatus, StatusChange, TimeWindow,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use super::notify::{StatusCallback, StatusNotifier};
use super::state::ProviderRateLimitState;
use super::PRIMARY_WINDOW;
use crate::clock::{Clock, SystemClock};

/// Point-in-time view of one provider (for display)
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSnapshot {
    pub provider_id: String,
    pub status: RateLimitStatus,
    pub minute_count: u32,
    pub minute_limit: u32,
    pub hour_count: u32,
    pub hour_limit: u32,
    pub day_count: u32,
    pub day_limit: u32,
    pub quota_exhausted: bool,
    pub quota_reset_time: Option<DateTime<Utc>>,
}

type SharedState = Arc<RwLock<ProviderRateLimitState>>;

/// Admission control for provider-level API calls.
pub struct RateLimitManager {
    providers: DashMap<String, SharedState>,
    notifier: StatusNotifier,
    clock: Arc<dyn Clock>,
}

impl RateLimitManager {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { providers: DashMap::new(), notifier: StatusNotifier::new(), clock }
    }

    /// Build a manager with every provider from `config`, rejecting invalid limits.
    pub fn from_config(config: &GateConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let manager = Self::with_clock(clock);
        for (provider_id, limits) in &config.providers {
            manager.configure_provider(provider_id, *limits)?;
        }
        Ok(manager)
    }

    /// Add a provider or replace its limits, keeping recorded call history.
    pub fn configure_provider(
        &self,
        provider_id: &str,
        limits: ProviderLimitsConfig,
    ) -> Result<(), ConfigError> {
        limits.validate_limits().map_err(|e| match e {
            ConfigError::ValidationError { field, message } => ConfigError::ValidationError {
                field: format!("providers.{}.{}", provider_id, field),
                message,
            },
            other => other,
        })?;

        if let Some(existing) = self.state(provider_id) {
            existing.write().limits = limits;
            tracing::info!("Updated limits for provider {}", provider_id);
        } else {
            self.providers.insert(
                provider_id.to_string(),
                Arc::new(RwLock::new(ProviderRateLimitState::new(provider_id, limits))),
            );
            tracing::info!(
                "Registered provider {} ({}/min, {}/h, {}/day)",
                provider_id,
                limits.per_minute,
                limits.per_hour,
                limits.per_day
            );
        }
        Ok(())
    }

    fn state(&self, provider_id: &str) -> Option<SharedState> {
        self.providers.get(provider_id).map(|entry| Arc::clone(entry.value()))
    }

    fn notify(&self, provider_id: &str, previous: RateLimitStatus, status: RateLimitStatus) {
        self.notifier.dispatch(StatusChange {
            provider: provider_id.to_string(),
            previous,
            status,
        });
    }

    /// Register a completed call. Unknown providers are ignored.
    pub fn register_call(&self, provider_id: &str) {
        let Some(state) = self.state(provider_id) else {
            tracing::debug!("register_call for unconfigured provider {}, ignoring", provider_id);
            return;
        };
        let now = self.clock.now();

        let change = {
            let mut guard = state.write();
            guard.record_call(now);
            let status = guard.evaluate(now);
            guard.transition(status).map(|previous| (previous, status))
        };

        if let Some((previous, status)) = change {
            self.notify(provider_id, previous, status);
        }
    }

    /// (current count, limit) on the primary window; (0, 0) for unknown providers.
    pub fn get_provider_usage(&self, provider_id: &str) -> (u32, u32) {
        let Some(state) = self.state(provider_id) else {
            return (0, 0);
        };
        let now = self.clock.now();
        let guard = state.read();
        (guard.count(PRIMARY_WINDOW, now), guard.limits.limit_for(PRIMARY_WINDOW))
    }

    /// Current status. Clears an exhausted quota whose reset time has passed.
    ///
    /// A status that differs from the last notified one (calls aging out of
    /// the window, quota recovery) is delivered to observers from here.
    pub fn get_provider_status(&self, provider_id: &str) -> RateLimitStatus {
        let Some(state) = self.state(provider_id) else {
            return RateLimitStatus::Normal;
        };
        let now = self.clock.now();

        {
            let guard = state.read();
            if let Some(status) = guard.peek_status(now) {
                if status == guard.last_notified {
                    return status;
                }
            }
        }

        let (status, change) = {
            let mut guard = state.write();
            let status = guard.evaluate(now);
            (status, guard.transition(status))
        };
        if let Some(previous) = change {
            self.notify(provider_id, previous, status);
        }
        status
    }

    /// Flag the provider's daily quota as exhausted until `reset_time`.
    ///
    /// Repeated calls while exhausted only extend the reset time.
    pub fn set_quota_exhausted(&self, provider_id: &str, reset_time: DateTime<Utc>) {
        let Some(state) = self.state(provider_id) else {
            tracing::debug!("set_quota_exhausted for unconfigured provider {}, ignoring", provider_id);
            return;
        };

        let change = {
            let mut guard = state.write();
            if guard.daily_quota_exhausted {
                if guard.daily_quota_reset_time.map_or(true, |current| reset_time > current) {
                    guard.daily_quota_reset_time = Some(reset_time);
                }
                None
            } else {
                guard.daily_quota_exhausted = true;
                guard.daily_quota_reset_time = Some(reset_time);
                tracing::warn!("Provider {} quota exhausted until {}", provider_id, reset_time);
                guard.transition(RateLimitStatus::QuotaExhausted)
            }
        };

        if let Some(previous) = change {
            self.notify(provider_id, previous, RateLimitStatus::QuotaExhausted);
        }
    }

    /// Clear a quota exhaustion flag and notify the resulting threshold status.
    pub fn clear_quota_exhaustion(&self, provider_id: &str) {
        let Some(state) = self.state(provider_id) else {
            return;
        };
        let now = self.clock.now();

        let change = {
            let mut guard = state.write();
            if !guard.daily_quota_exhausted {
                return;
            }
            guard.daily_quota_exhausted = false;
            guard.daily_quota_reset_time = None;
            tracing::info!("Provider {} quota exhaustion cleared", provider_id);
            let status = guard.evaluate(now);
            guard.transition(status).map(|previous| (previous, status))
        };

        if let Some((previous, status)) = change {
            self.notify(provider_id, previous, status);
        }
    }

    /// Add an observer for all future status transitions.
    pub fn register_status_callback<F>(&self, callback: F)
    where
        F: Fn(&StatusChange) + Send + Sync + 'static,
    {
        self.notifier.register(Arc::new(callback));
    }

    /// Channel-based alternative to callbacks.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.notifier.subscribe()
    }

    pub fn callback_count(&self) -> usize {
        self.notifier.callback_count()
    }

    /// Whether a call to `provider_id` should be attempted now.
    pub fn can_call(&self, provider_id: &str) -> bool {
        if !self.get_provider_status(provider_id).admits_calls() {
            return false;
        }
        let Some(state) = self.state(provider_id) else {
            return true;
        };
        let now = self.clock.now();
        let exhausted = state.read().window_exhausted(now);
        exhausted.is_none()
    }

    /// How long until the provider admits calls again; `None` if it does now.
    pub fn time_until_available(&self, provider_id: &str) -> Option<Duration> {
        if self.can_call(provider_id) {
            return None;
        }
        let state = self.state(provider_id)?;
        let now = self.clock.now();
        let guard = state.read();

        let available_at = if guard.daily_quota_exhausted {
            guard.daily_quota_reset_time.unwrap_or(now)
        } else {
            TimeWindow::ALL
                .into_iter()
                .filter(|window| {
                    let limit = guard.limits.limit_for(*window);
                    limit > 0
                        && (guard.count(*window, now) >= limit
                            || (*window == PRIMARY_WINDOW
                                && guard.peek_status(now) == Some(RateLimitStatus::Throttled)))
                })
                .filter_map(|window| guard.oldest_live(window, now).map(|at| at + window.duration()))
                .max()
                .unwrap_or(now)
        };

        (available_at - now).to_std().ok()
    }

    /// Display string for presence/status surfaces.
    pub fn status_message(&self, provider_id: &str) -> String {
        let status = self.get_provider_status(provider_id);
        match status {
            RateLimitStatus::Normal | RateLimitStatus::Warning => status.to_string(),
            RateLimitStatus::Throttled => match self.time_until_available(provider_id) {
                Some(wait) => format!("{} (try again in {})", status, format_wait_time(wait)),
                None => status.to_string(),
            },
            RateLimitStatus::QuotaExhausted => {
                let now = self.clock.now();
                let reset = self.state(provider_id).and_then(|state| {
                    let reset = state.read().daily_quota_reset_time;
                    reset
                });
                match reset {
                    Some(reset) if reset == next_midnight_utc(now) => {
                        format!("{} (service restored at midnight UTC)", status)
                    }
                    Some(reset) => match (reset - now).to_std() {
                        Ok(wait) => format!("{} (service restored in {})", status, format_wait_time(wait)),
                        Err(_) => status.to_string(),
                    },
                    None => status.to_string(),
                }
            }
        }
    }

    pub fn snapshot(&self, provider_id: &str) -> Option<ProviderSnapshot> {
        let status = self.get_provider_status(provider_id);
        let state = self.state(provider_id)?;
        let now = self.clock.now();
        let guard = state.read();
        Some(ProviderSnapshot {
            provider_id: guard.provider_id.clone(),
            status,
            minute_count: guard.count(TimeWindow::Minute, now),
            minute_limit: guard.limits.per_minute,
            hour_count: guard.count(TimeWindow::Hour, now),
            hour_limit: guard.limits.per_hour,
            day_count: guard.count(TimeWindow::Day, now),
            day_limit: guard.limits.per_day,
            quota_exhausted: guard.daily_quota_exhausted,
            quota_reset_time: guard.daily_quota_reset_time,
        })
    }

    pub fn providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for RateLimitManager {
    fn default() -> Self {
        Self::new()
    }
}
