use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::{CounterInfo, CounterStore, Expiry};
use crate::AuthError;

#[derive(Debug, Clone)]
enum Slot {
    Counter(u64),
    Value(String),
}

#[derive(Debug, Clone)]
struct Entry {
    slot: Slot,
    expires_at: DateTime<Utc>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Process-local store. State is lost on restart and not shared between
/// instances; use the Postgres or Redis store for that.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

fn lock_error() -> AuthError {
    AuthError::StoreUnavailable("Failed to acquire lock".to_owned())
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops expired entries. Call periodically in long-running processes.
    pub fn cleanup_expired(&self, now: DateTime<Utc>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, entry| entry.is_live(now));
        }
    }

    /// Runs [`cleanup_expired`](Self::cleanup_expired) every `every` until
    /// the returned task is aborted.
    pub fn spawn_cleanup(&self, every: std::time::Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                store.cleanup_expired(Utc::now());
            }
        })
    }

    /// Number of entries, including expired ones not yet cleaned up.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
#[allow(clippy::significant_drop_tightening)]
impl CounterStore for InMemoryStore {
    async fn increment(
        &self,
        key: &str,
        ttl: Duration,
        expiry: Expiry,
        now: DateTime<Utc>,
    ) -> Result<CounterInfo, AuthError> {
        let mut entries = self.entries.write().map_err(|_| lock_error())?;

        let entry = entries.entry(key.to_owned()).or_insert_with(|| Entry {
            slot: Slot::Counter(0),
            expires_at: now,
        });

        let count = match (&entry.slot, entry.is_live(now)) {
            (Slot::Counter(n), true) => n + 1,
            (Slot::Value(_), true) => {
                return Err(AuthError::Internal(format!("key {key} does not hold a counter")));
            }
            (_, false) => {
                entry.expires_at = now + ttl;
                1
            }
        };

        entry.slot = Slot::Counter(count);
        if expiry == Expiry::Sliding {
            entry.expires_at = now + ttl;
        }

        Ok(CounterInfo {
            count,
            expires_at: entry.expires_at,
        })
    }

    async fn count(&self, key: &str, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let entries = self.entries.read().map_err(|_| lock_error())?;

        Ok(match entries.get(key) {
            Some(Entry {
                slot: Slot::Counter(n),
                expires_at,
            }) if *expires_at > now => *n,
            _ => 0,
        })
    }

    async fn put(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let mut entries = self.entries.write().map_err(|_| lock_error())?;

        entries.insert(
            key.to_owned(),
            Entry {
                slot: Slot::Value(value.to_owned()),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<String>, AuthError> {
        let entries = self.entries.read().map_err(|_| lock_error())?;

        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| match &entry.slot {
                Slot::Counter(n) => n.to_string(),
                Slot::Value(v) => v.clone(),
            }))
    }

    async fn forget(&self, key: &str) -> Result<(), AuthError> {
        let mut entries = self.entries.write().map_err(|_| lock_error())?;

        entries.remove(key);
        Ok(())
    }
}
