//! Primary/fallback model selection.
//!
//! Each configured model carries its own rate-limit and quota flags.
//! Restoration is pull-based: [`ModelFallbackCoordinator::select_model`]
//! clears expired flags before choosing, so an idle coordinator heals on
//! its next use without a background timer.

mod classifier;
mod coordinator;
mod types;


pub use classifier::{
    classify_model_error, is_daily_quota_error, is_model_rate_limited, parse_retry_hint,
};
pub use coordinator::ModelFallbackCoordinator;
pub use types::{ModelAvailability, ModelErrorKind};
