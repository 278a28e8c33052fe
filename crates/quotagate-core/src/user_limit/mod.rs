//! Per-user rate limiting.
//!
//! Counters live in a [`CounterStore`](crate::modules::store::CounterStore)
//! keyed by (user, window). A check reads the current window instance of
//! every window; a record increments them. The two steps are deliberately
//! not atomic: concurrent requests from one user may each pass the check
//! before either records, so a window can be exceeded by at most
//! (in-flight requests - 1).

mod admin;
mod limiter;
mod validation;


pub use admin::{parse_admin_role_names, roles_grant_bypass, ADMIN_ROLE_NAMES_KEY};
pub use limiter::{UserRateLimiter, RATE_LIMIT_RETENTION_DAYS};
pub use validation::{
    validate_rate_limit_configuration, MAX_REQUESTS_PER_DAY, MAX_REQUESTS_PER_HOUR,
    MAX_REQUESTS_PER_MINUTE,
};
