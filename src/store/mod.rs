//! Key-value counter store with per-key expiry.
//!
//! The abuse guard and the API throttle keep all of their state here. Every
//! backend must make [`CounterStore::increment`] atomic: concurrent increments
//! of one key observe distinct post-increment counts.
//!
//! | Backend | Feature | Atomicity |
//! |---------|---------|-----------|
//! | [`InMemoryStore`] | always | map behind a write lock |
//! | [`PostgresCounterStore`] | `sqlx_postgres` | `INSERT .. ON CONFLICT .. RETURNING` |
//! | [`RedisCounterStore`] | `redis_store` | Lua script |

mod memory;

#[cfg(feature = "sqlx_postgres")]
mod postgres;

#[cfg(feature = "redis_store")]
mod redis_store;

pub use memory::InMemoryStore;

#[cfg(feature = "sqlx_postgres")]
pub use postgres::PostgresCounterStore;

#[cfg(feature = "redis_store")]
pub use redis_store::RedisCounterStore;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::AuthError;

/// How a counter's TTL behaves across increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// TTL is set by the increment that creates the key and never extended.
    FromFirstHit,
    /// TTL is reset to the full duration on every increment.
    Sliding,
}

/// State of a counter after an increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterInfo {
    pub count: u64,
    pub expires_at: DateTime<Utc>,
}

impl CounterInfo {
    /// Seconds until the counter expires, never negative.
    pub fn available_in(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

/// Storage for attempt counters and block markers.
///
/// `now` is explicit so callers (and tests) control the clock. Backends that
/// expire keys server-side, like Redis, use it only to report `expires_at`.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Adds one to `key`, creating it with a count of 1 and the given TTL if it
    /// is missing or expired.
    async fn increment(
        &self,
        key: &str,
        ttl: Duration,
        expiry: Expiry,
        now: DateTime<Utc>,
    ) -> Result<CounterInfo, AuthError>;

    /// Current count, 0 when missing or expired. Never mutates.
    async fn count(&self, key: &str, now: DateTime<Utc>) -> Result<u64, AuthError>;

    /// Stores a plain value with a TTL, replacing anything under `key`.
    async fn put(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<String>, AuthError>;

    async fn has(&self, key: &str, now: DateTime<Utc>) -> Result<bool, AuthError> {
        Ok(self.get(key, now).await?.is_some())
    }

    /// Removes `key`. Missing keys are not an error.
    async fn forget(&self, key: &str) -> Result<(), AuthError>;
}
