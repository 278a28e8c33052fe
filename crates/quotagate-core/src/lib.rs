//! # Quotagate Core
//!
//! Admission control and quota management for calls to quota-limited AI
//! backends.
//!
//! ## Architecture
//!
//! ```text
//! quotagate-core/src/
//! ├── clock.rs          # Wall-clock source (system or manual)
//! ├── provider_limit/   # Sliding-window provider limits + status observers
//! ├── user_limit/       # Persisted per-user quotas + admin bypass
//! ├── model_fallback/   # Primary/fallback model selection
//! └── modules/          # Counter stores, config loading, logging
//! ```
//!
//! The three managers share one vocabulary (windows, thresholds, reset
//! instants) but keep independent state. Each is an owned value meant to be
//! wrapped in `Arc` and injected into call sites.

#![allow(
    clippy::significant_drop_tightening,
    reason = "RwLock guards are scoped explicitly around state mutation"
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::float_cmp, clippy::panic))]

pub mod clock;
pub mod model_fallback;
pub mod modules;
pub mod provider_limit;
pub mod user_limit;

pub use clock::{Clock, ManualClock, SystemClock};
pub use model_fallback::{
    classify_model_error, is_daily_quota_error, is_model_rate_limited, ModelAvailability,
    ModelErrorKind, ModelFallbackCoordinator,
};
pub use modules::store::{CounterStore, InMemoryCounterStore, PostgresCounterStore};
pub use provider_limit::{ProviderSnapshot, RateLimitManager, StatusCallback};
pub use quotagate_types::{
    ConfigError, GateConfig, GateError, GuildContext, ModelFallbackConfig, ProviderLimitsConfig,
    RateLimitStatus, StatusChange, StoreError, TimeWindow, UserLimitsConfig, UserRateLimitRecord,
    UserRateLimitResult,
};
pub use user_limit::{validate_rate_limit_configuration, UserRateLimiter, ADMIN_ROLE_NAMES_KEY};
