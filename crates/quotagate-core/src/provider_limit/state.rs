//! Per-provider sliding window state.

use chrono::{DateTime, Utc};
use quotagate_types::{ProviderLimitsConfig, RateLimitStatus, TimeWindow};
use std::collections::VecDeque;

use super::PRIMARY_WINDOW;

/// In-memory call history and quota flags for one provider.
///
/// Timestamp lists only ever hold instants within their window of the last
/// pruning instant; counts taken without pruning filter on the fly.
#[derive(Debug, Clone)]
pub struct ProviderRateLimitState {
    pub(crate) provider_id: String,
    pub(crate) limits: ProviderLimitsConfig,
    /// Indexed like `TimeWindow::ALL`
    pub(crate) calls: [VecDeque<DateTime<Utc>>; 3],
    pub(crate) daily_quota_exhausted: bool,
    pub(crate) daily_quota_reset_time: Option<DateTime<Utc>>,
    /// Last status delivered to observers (debounce key)
    pub(crate) last_notified: RateLimitStatus,
}

fn slot(window: TimeWindow) -> usize {
    match window {
        TimeWindow::Minute => 0,
        TimeWindow::Hour => 1,
        TimeWindow::Day => 2,
    }
}

fn is_live(at: DateTime<Utc>, window: TimeWindow, now: DateTime<Utc>) -> bool {
    now - at < window.duration()
}

/// Threshold evaluation on a raw count. A zero limit is never limiting.
pub(crate) fn threshold_status(count: u32, limits: &ProviderLimitsConfig) -> RateLimitStatus {
    let limit = limits.limit_for(PRIMARY_WINDOW);
    if limit == 0 {
        return RateLimitStatus::Normal;
    }
    let utilization = f64::from(count) / f64::from(limit);
    if utilization >= limits.throttled_threshold {
        RateLimitStatus::Throttled
    } else if utilization >= limits.warning_threshold {
        RateLimitStatus::Warning
    } else {
        RateLimitStatus::Normal
    }
}

impl ProviderRateLimitState {
    pub fn new(provider_id: impl Into<String>, limits: ProviderLimitsConfig) -> Self {
        Self {
            provider_id: provider_id.into(),
            limits,
            calls: [VecDeque::new(), VecDeque::new(), VecDeque::new()],
            daily_quota_exhausted: false,
            daily_quota_reset_time: None,
            last_notified: RateLimitStatus::Normal,
        }
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn limits(&self) -> &ProviderLimitsConfig {
        &self.limits
    }

    fn is_configured(&self, window: TimeWindow) -> bool {
        self.limits.limit_for(window) > 0
    }

    /// Append `now` to every configured window and prune stale entries.
    pub(crate) fn record_call(&mut self, now: DateTime<Utc>) {
        for window in TimeWindow::ALL {
            if self.is_configured(window) {
                self.calls[slot(window)].push_back(now);
            }
        }
        self.prune(now);
    }

    /// Drop entries older than their window, regardless of insertion order.
    pub(crate) fn prune(&mut self, now: DateTime<Utc>) {
        for window in TimeWindow::ALL {
            self.calls[slot(window)].retain(|at| is_live(*at, window, now));
        }
    }

    /// Live calls in `window` as of `now`, without mutating.
    pub fn count(&self, window: TimeWindow, now: DateTime<Utc>) -> u32 {
        let live = self.calls[slot(window)].iter().filter(|at| is_live(**at, window, now)).count();
        u32::try_from(live).unwrap_or(u32::MAX)
    }

    /// Oldest live call in `window`, which is the next to expire.
    pub(crate) fn oldest_live(&self, window: TimeWindow, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.calls[slot(window)].iter().filter(|at| is_live(**at, window, now)).min().copied()
    }

    /// Whether an exhausted quota has passed its reset time and must be cleared.
    pub(crate) fn quota_reset_due(&self, now: DateTime<Utc>) -> bool {
        self.daily_quota_exhausted && self.daily_quota_reset_time.map_or(true, |reset| now >= reset)
    }

    /// Status without side effects. `None` when a stale quota flag needs clearing first.
    pub(crate) fn peek_status(&self, now: DateTime<Utc>) -> Option<RateLimitStatus> {
        if self.daily_quota_exhausted {
            if self.quota_reset_due(now) {
                return None;
            }
            return Some(RateLimitStatus::QuotaExhausted);
        }
        Some(threshold_status(self.count(PRIMARY_WINDOW, now), &self.limits))
    }

    /// Full status evaluation, auto-clearing an expired quota flag.
    pub(crate) fn evaluate(&mut self, now: DateTime<Utc>) -> RateLimitStatus {
        if self.daily_quota_exhausted {
            if !self.quota_reset_due(now) {
                return RateLimitStatus::QuotaExhausted;
            }
            tracing::warn!(
                "Provider {} still flagged quota-exhausted past reset time {:?}, clearing",
                self.provider_id,
                self.daily_quota_reset_time
            );
            self.daily_quota_exhausted = false;
            self.daily_quota_reset_time = None;
        }
        self.prune(now);
        threshold_status(self.count(PRIMARY_WINDOW, now), &self.limits)
    }

    /// Record `status` as notified; returns the previous status if it changed.
    pub(crate) fn transition(&mut self, status: RateLimitStatus) -> Option<RateLimitStatus> {
        if self.last_notified == status {
            return None;
        }
        let previous = self.last_notified;
        self.last_notified = status;
        Some(previous)
    }

    /// Whether any configured window has reached its absolute limit.
    pub(crate) fn window_exhausted(&self, now: DateTime<Utc>) -> Option<TimeWindow> {
        TimeWindow::ALL.into_iter().find(|window| {
            let limit = self.limits.limit_for(*window);
            limit > 0 && self.count(*window, now) >= limit
        })
    }
}
