//! In-memory counter store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use quotagate_types::{TimeWindow, UserRateLimitRecord};
use std::collections::HashMap;

use super::store::{CounterStore, StoreResult};

/// Process-local store for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    records: RwLock<HashMap<(String, TimeWindow), UserRateLimitRecord>>,
    configuration: RwLock<HashMap<String, String>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_configuration(&self, key: &str, value: &str) {
        self.configuration.write().insert(key.to_string(), value.to_string());
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn get_user_rate_limit(
        &self,
        user_id: &str,
        window: TimeWindow,
    ) -> StoreResult<Option<UserRateLimitRecord>> {
        Ok(self.records.read().get(&(user_id.to_string(), window)).cloned())
    }

    async fn upsert_user_rate_limit(&self, record: &UserRateLimitRecord) -> StoreResult<()> {
        self.records
            .write()
            .insert((record.user_id.clone(), record.window), record.clone());
        Ok(())
    }

    async fn get_configuration(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.configuration.read().get(key).cloned())
    }

    async fn reset_user_rate_limit(
        &self,
        user_id: &str,
        window: Option<TimeWindow>,
    ) -> StoreResult<u64> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|(user, w), _| user != user_id || window.is_some_and(|target| target != *w));
        Ok((before - records.len()) as u64)
    }

    async fn cleanup_expired_user_rate_limits(
        &self,
        older_than: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let cutoff = older_than.timestamp();
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, record| record.last_request >= cutoff);
        Ok((before - records.len()) as u64)
    }
}
