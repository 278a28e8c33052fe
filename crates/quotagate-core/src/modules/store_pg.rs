//! PostgreSQL implementation of the counter store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quotagate_types::{StoreError, TimeWindow, UserRateLimitRecord};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;

use super::store::{CounterStore, StoreResult};

fn map_sqlx_err(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

fn row_to_record(row: &sqlx::postgres::PgRow) -> StoreResult<UserRateLimitRecord> {
    let window_type: String = row.get("window_type");
    let window = window_type.parse::<TimeWindow>().map_err(StoreError::Serialization)?;
    let request_count: i32 = row.get("request_count");

    Ok(UserRateLimitRecord {
        user_id: row.get("user_id"),
        window,
        request_count: u32::try_from(request_count).unwrap_or(0),
        window_start: row.get("window_start"),
        last_request: row.get("last_request"),
    })
}

/// PostgreSQL-backed counter store.
pub struct PostgresCounterStore {
    pool: PgPool,
}

impl PostgresCounterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(300))
            .connect(database_url)
            .await
            .map_err(map_sqlx_err)?;
        Ok(Self::new(pool))
    }

    /// Create the two tables this store reads and writes, if missing.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_rate_limits (
                user_id TEXT NOT NULL,
                window_type TEXT NOT NULL,
                request_count INTEGER NOT NULL DEFAULT 0,
                window_start BIGINT NOT NULL,
                last_request BIGINT NOT NULL,
                PRIMARY KEY (user_id, window_type)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS configuration (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    pub async fn set_configuration(&self, key: &str, value: &str) -> StoreResult<()> {
        sqlx::query(
            r#"INSERT INTO configuration (key, value) VALUES ($1, $2)
               ON CONFLICT (key) DO UPDATE SET value = $2"#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }
}

#[async_trait]
impl CounterStore for PostgresCounterStore {
    async fn get_user_rate_limit(
        &self,
        user_id: &str,
        window: TimeWindow,
    ) -> StoreResult<Option<UserRateLimitRecord>> {
        let row = sqlx::query(
            r#"SELECT user_id, window_type, request_count, window_start, last_request
               FROM user_rate_limits WHERE user_id = $1 AND window_type = $2"#,
        )
        .bind(user_id)
        .bind(window.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn upsert_user_rate_limit(&self, record: &UserRateLimitRecord) -> StoreResult<()> {
        let count = i32::try_from(record.request_count)
            .map_err(|err| StoreError::Serialization(err.to_string()))?;
        sqlx::query(
            r#"INSERT INTO user_rate_limits (user_id, window_type, request_count, window_start, last_request)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (user_id, window_type) DO UPDATE
               SET request_count = $3, window_start = $4, last_request = $5"#,
        )
        .bind(&record.user_id)
        .bind(record.window.as_str())
        .bind(count)
        .bind(record.window_start)
        .bind(record.last_request)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn get_configuration(&self, key: &str) -> StoreResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM configuration WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(row.map(|r| r.get("value")))
    }

    async fn reset_user_rate_limit(
        &self,
        user_id: &str,
        window: Option<TimeWindow>,
    ) -> StoreResult<u64> {
        let result = match window {
            Some(w) => {
                sqlx::query("DELETE FROM user_rate_limits WHERE user_id = $1 AND window_type = $2")
                    .bind(user_id)
                    .bind(w.as_str())
                    .execute(&self.pool)
                    .await
            }
            None => {
                sqlx::query("DELETE FROM user_rate_limits WHERE user_id = $1")
                    .bind(user_id)
                    .execute(&self.pool)
                    .await
            }
        }
        .map_err(map_sqlx_err)?;
        Ok(result.rows_affected())
    }

    async fn cleanup_expired_user_rate_limits(
        &self,
        older_than: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM user_rate_limits WHERE last_request < $1")
            .bind(older_than.timestamp())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(result.rows_affected())
    }
}
