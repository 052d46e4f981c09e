use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use redis::aio::ConnectionManager;
use redis::{Client, Script};

use super::{CounterInfo, CounterStore, Expiry};
use crate::AuthError;

// KEYS[1] counter key, ARGV[1] ttl in ms, ARGV[2] "1" for sliding expiry
const INCREMENT_SCRIPT: &str = r#"
    local count = redis.call("INCR", KEYS[1])
    local ttl = redis.call("PTTL", KEYS[1])

    if count == 1 or ARGV[2] == "1" or ttl < 0 then
        redis.call("PEXPIRE", KEYS[1], ARGV[1])
        ttl = tonumber(ARGV[1])
    end

    return {count, ttl}
"#;

/// Redis-backed counter store.
///
/// Expiry is enforced by Redis itself, so the `now` argument only feeds the
/// `expires_at` reported back from increments.
#[derive(Clone)]
pub struct RedisCounterStore {
    connection_manager: ConnectionManager,
    increment_script: Script,
}

fn redis_error(operation: &str, e: &redis::RedisError) -> AuthError {
    log::error!(target: "turnstile_auth", "msg=\"redis error\", operation=\"{operation}\", error=\"{e}\"");
    AuthError::StoreUnavailable(e.to_string())
}

fn ttl_millis(ttl: Duration) -> i64 {
    ttl.num_milliseconds().max(1)
}

impl RedisCounterStore {
    pub fn new(connection_manager: ConnectionManager) -> Self {
        Self {
            connection_manager,
            increment_script: Script::new(INCREMENT_SCRIPT),
        }
    }

    /// Opens a managed, auto-reconnecting connection to `url`.
    pub async fn connect(url: &str) -> Result<Self, AuthError> {
        let client = Client::open(url).map_err(|e| redis_error("connect", &e))?;
        let connection_manager = ConnectionManager::new(client)
            .await
            .map_err(|e| redis_error("connect", &e))?;

        Ok(Self::new(connection_manager))
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn increment(
        &self,
        key: &str,
        ttl: Duration,
        expiry: Expiry,
        now: DateTime<Utc>,
    ) -> Result<CounterInfo, AuthError> {
        let mut connection_manager = self.connection_manager.clone();
        let sliding = if expiry == Expiry::Sliding { "1" } else { "0" };

        let (count, remaining_ms): (u64, i64) = self
            .increment_script
            .key(key)
            .arg(ttl_millis(ttl))
            .arg(sliding)
            .invoke_async(&mut connection_manager)
            .await
            .map_err(|e| redis_error("counter_increment", &e))?;

        Ok(CounterInfo {
            count,
            expires_at: now + Duration::milliseconds(remaining_ms.max(0)),
        })
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn count(&self, key: &str, _now: DateTime<Utc>) -> Result<u64, AuthError> {
        let mut connection_manager = self.connection_manager.clone();

        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut connection_manager)
            .await
            .map_err(|e| redis_error("counter_count", &e))?;

        Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, value), err))]
    async fn put(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        _now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let mut connection_manager = self.connection_manager.clone();

        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut connection_manager)
            .await
            .map_err(|e| redis_error("counter_put", &e))?;

        Ok(())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn get(&self, key: &str, _now: DateTime<Utc>) -> Result<Option<String>, AuthError> {
        let mut connection_manager = self.connection_manager.clone();

        redis::cmd("GET")
            .arg(key)
            .query_async(&mut connection_manager)
            .await
            .map_err(|e| redis_error("counter_get", &e))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn forget(&self, key: &str) -> Result<(), AuthError> {
        let mut connection_manager = self.connection_manager.clone();

        let _: () = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut connection_manager)
            .await
            .map_err(|e| redis_error("counter_forget", &e))?;

        Ok(())
    }
}
