//! Counter store trait for per-user rate limit persistence.
//!
//! The admission core consumes this interface; storage engines implement it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quotagate_types::{StoreError, TimeWindow, UserRateLimitRecord};

pub use super::store_memory::InMemoryCounterStore;
pub use super::store_pg::PostgresCounterStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Record for (user, window), whichever window instance it belongs to.
    async fn get_user_rate_limit(
        &self,
        user_id: &str,
        window: TimeWindow,
    ) -> StoreResult<Option<UserRateLimitRecord>>;

    /// Insert or overwrite the record keyed by (user, window).
    async fn upsert_user_rate_limit(&self, record: &UserRateLimitRecord) -> StoreResult<()>;

    /// Arbitrary string configuration value.
    async fn get_configuration(&self, key: &str) -> StoreResult<Option<String>>;

    /// Delete one window's record, or every window when `window` is `None`.
    /// Returns the number of deleted records.
    async fn reset_user_rate_limit(
        &self,
        user_id: &str,
        window: Option<TimeWindow>,
    ) -> StoreResult<u64>;

    /// Delete records whose last request is before `older_than`.
    async fn cleanup_expired_user_rate_limits(&self, older_than: DateTime<Utc>)
        -> StoreResult<u64>;
}
