//! Provider Rate Limiting Module
//!
//! Sliding-window admission control for provider-level API calls:
//! - Per-provider call timestamps for each configured window
//! - Threshold-based status (`Normal` → `Warning` → `Throttled`)
//! - Daily quota exhaustion with time-based auto-recovery on read
//! - Debounced status-change notifications to isolated observers
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  RateLimitManager                                            │
//! │  ├── providers: DashMap<String, Arc<RwLock<ProviderState>>>  │
//! │  ├── notifier: callbacks + broadcast channel                 │
//! │  └── clock: Arc<dyn Clock>                                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status is recomputed from raw timestamps on every registration and query.
//! Notifications are dispatched after the record lock is released.

mod manager;
mod notify;
mod state;

#[cfg(test)]
mod tests;

pub use manager::{ProviderSnapshot, RateLimitManager};
pub use notify::StatusCallback;
pub use state::ProviderRateLimitState;

/// Window used for usage display and status thresholds.
pub const PRIMARY_WINDOW: quotagate_types::TimeWindow = quotagate_types::TimeWindow::Minute;
