//! # Quotagate Types
//!
//! Core types, models, and error definitions for the quotagate admission core.
//!
//! - **`error`** - Typed error hierarchy for configuration and counter storage
//! - **`models`** - Time windows, rate limit status, per-user records and configuration
//!
//! ## Architecture Role
//!
//! `quotagate-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!      quotagate-types (this crate)
//!              │
//!              ▼
//!       quotagate-core
//!   (providers, users, models)
//! ```

pub mod error;
pub mod models;

pub use error::{ConfigError, GateError, Result, StoreError};

pub use models::{
    format_wait_time, next_midnight_utc, GateConfig, GuildContext, ModelFallbackConfig,
    ProviderLimitsConfig, RateLimitStatus, StatusChange, TimeWindow, UserLimitsConfig,
    UserRateLimitRecord, UserRateLimitResult, WindowUsage,
};
