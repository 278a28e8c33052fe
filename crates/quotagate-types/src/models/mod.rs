//! Domain models shared by the admission managers.

pub mod config;
mod status;
mod user;
mod window;

pub use config::{
    GateConfig, ModelFallbackConfig, ProviderLimitsConfig, UserLimitsConfig, MAX_REQUESTS_PER_DAY,
    MAX_REQUESTS_PER_HOUR, MAX_REQUESTS_PER_MINUTE,
};
pub use status::{RateLimitStatus, StatusChange};
pub use user::{GuildContext, UserRateLimitRecord, UserRateLimitResult, WindowUsage};
pub use window::{format_wait_time, next_midnight_utc, TimeWindow};
