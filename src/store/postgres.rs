use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use super::{CounterInfo, CounterStore, Expiry};
use crate::AuthError;
use crate::postgres::db_error;

/// `PostgreSQL`-backed counter store, for deployments where several
/// instances must share guard state.
///
/// # Table Schema
///
/// ```sql
/// CREATE TABLE counter_store (
///     key VARCHAR(255) PRIMARY KEY,
///     counter BIGINT,
///     value TEXT,
///     expires_at TIMESTAMPTZ NOT NULL
/// );
///
/// CREATE INDEX idx_counter_store_expires_at ON counter_store(expires_at);
/// ```
///
/// A row holds either a `counter` or a `value`. Expired rows are ignored by
/// every read and recycled by the next write to the same key.
#[derive(Clone)]
pub struct PostgresCounterStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct CounterRow {
    counter: i64,
    expires_at: DateTime<Utc>,
}

impl PostgresCounterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Deletes expired rows and returns how many were removed.
    pub async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM counter_store WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("counter_cleanup_expired", &e))?;

        Ok(result.rows_affected())
    }

    /// Deletes expired rows every `every` until the returned task is aborted.
    /// Failures are logged and retried on the next tick.
    pub fn spawn_cleanup(&self, every: std::time::Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                match store.cleanup_expired(Utc::now()).await {
                    Ok(0) => {}
                    Ok(removed) => log::debug!(
                        target: "turnstile_auth",
                        "msg=\"pruned expired counters\", removed={removed}"
                    ),
                    Err(e) => log::error!(
                        target: "turnstile_auth",
                        "msg=\"counter cleanup failed\", error=\"{e}\""
                    ),
                }
            }
        })
    }
}

#[async_trait]
impl CounterStore for PostgresCounterStore {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn increment(
        &self,
        key: &str,
        ttl: Duration,
        expiry: Expiry,
        now: DateTime<Utc>,
    ) -> Result<CounterInfo, AuthError> {
        let fresh_expiry = now + ttl;

        let row: CounterRow = sqlx::query_as(
            r"
            INSERT INTO counter_store (key, counter, value, expires_at)
            VALUES ($1, 1, NULL, $3)
            ON CONFLICT (key) DO UPDATE SET
                counter = CASE
                    WHEN counter_store.expires_at <= $2 THEN 1
                    ELSE COALESCE(counter_store.counter, 0) + 1
                END,
                value = NULL,
                expires_at = CASE
                    WHEN counter_store.expires_at <= $2 OR $4 THEN $3
                    ELSE counter_store.expires_at
                END
            RETURNING counter, expires_at
            ",
        )
        .bind(key)
        .bind(now)
        .bind(fresh_expiry)
        .bind(expiry == Expiry::Sliding)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("counter_increment", &e))?;

        Ok(CounterInfo {
            count: u64::try_from(row.counter).unwrap_or(0),
            expires_at: row.expires_at,
        })
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn count(&self, key: &str, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let counter: Option<Option<i64>> = sqlx::query_scalar(
            "SELECT counter FROM counter_store WHERE key = $1 AND expires_at > $2",
        )
        .bind(key)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("counter_count", &e))?;

        Ok(counter
            .flatten()
            .and_then(|c| u64::try_from(c).ok())
            .unwrap_or(0))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, value), err))]
    async fn put(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        sqlx::query(
            r"
            INSERT INTO counter_store (key, counter, value, expires_at)
            VALUES ($1, NULL, $2, $3)
            ON CONFLICT (key) DO UPDATE SET
                counter = NULL,
                value = EXCLUDED.value,
                expires_at = EXCLUDED.expires_at
            ",
        )
        .bind(key)
        .bind(value)
        .bind(now + ttl)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("counter_put", &e))?;

        Ok(())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<String>, AuthError> {
        let value: Option<Option<String>> = sqlx::query_scalar(
            r"
            SELECT COALESCE(value, counter::TEXT)
            FROM counter_store
            WHERE key = $1 AND expires_at > $2
            ",
        )
        .bind(key)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("counter_get", &e))?;

        Ok(value.flatten())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn forget(&self, key: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM counter_store WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("counter_forget", &e))?;

        Ok(())
    }
}
