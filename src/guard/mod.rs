//! IP-based login abuse guard.
//!
//! Two independent limits run side by side for every client IP:
//!
//! - a daily budget: more than `daily_limit` attempts inside a 24h window
//!   (fixed from its first attempt) writes a daily block,
//! - a burst limit: more than `short_term_limit` attempts inside a sliding
//!   5 minute window writes a temp block.
//!
//! An active block refuses login requests before credentials are looked at.
//! Refused requests still count toward the daily budget but leave the burst
//! counter alone, so a temp block always runs out after `temp_block`.
//! A successful login clears the burst counter and the temp block; the daily
//! counter and daily block run out on their own.
//!
//! The guard holds no locks. Atomicity comes from
//! [`CounterStore::increment`](crate::store::CounterStore::increment).

mod decision;
pub mod keys;

pub use decision::{AdmitDecision, AttemptCounts, Block, BlockKind};

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::AuthError;
use crate::config::{GuardConfig, StoreFailurePolicy};
use crate::events::{self, AuthEvent};
use crate::store::{CounterStore, Expiry};
use decision::humanize;

const DAILY_BLOCKED_MESSAGE: &str =
    "You have exceeded the daily login attempt limit. Try again tomorrow.";
const TEMP_BLOCKED_MESSAGE: &str = "Too many rapid attempts. You are temporarily blocked.";
const STORE_DOWN_MESSAGE: &str = "Login is temporarily unavailable. Try again later.";

#[derive(Clone)]
pub struct AbuseGuard {
    store: Arc<dyn CounterStore>,
    config: GuardConfig,
}

/// Whole days a key created up to `span` ago can still be keyed under.
fn span_days(span: Duration) -> i64 {
    (span.num_seconds() + 86_399).div_euclid(86_400).max(0)
}

/// `today`, then each earlier date up to `days` back.
fn recent_dates(today: NaiveDate, days: i64) -> Vec<NaiveDate> {
    (0..=days)
        .filter_map(|d| today.checked_sub_signed(Duration::days(d)))
        .collect()
}

fn parse_blocked_until(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

impl AbuseGuard {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self::with_config(store, GuardConfig::default())
    }

    pub fn with_config(store: Arc<dyn CounterStore>, config: GuardConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    async fn call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, AuthError>>,
    ) -> Result<T, AuthError> {
        match tokio::time::timeout(self.config.store_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::StoreUnavailable(format!(
                "{operation} timed out after {}ms",
                self.config.store_timeout.as_millis()
            ))),
        }
    }

    /// Reads the block markers for `ip`. Never writes.
    ///
    /// A daily block wins over a temp block.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    pub async fn check_and_admit(
        &self,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<AdmitDecision, AuthError> {
        // a block written before midnight is keyed under an earlier date
        for date in recent_dates(now.date_naive(), span_days(self.config.daily_block)) {
            let key = keys::daily_block(ip, date);
            if let Some(value) = self.call("daily_block_get", self.store.get(&key, now)).await? {
                let blocked_until =
                    parse_blocked_until(&value).unwrap_or(now + self.config.daily_block);
                if blocked_until > now {
                    return Ok(AdmitDecision::Blocked(Block::new(
                        BlockKind::Daily,
                        blocked_until,
                        self.config.daily_block,
                        now,
                        DAILY_BLOCKED_MESSAGE,
                    )));
                }
            }
        }

        let key = keys::temp_block(ip);
        if let Some(value) = self.call("temp_block_get", self.store.get(&key, now)).await? {
            let blocked_until = parse_blocked_until(&value).unwrap_or(now + self.config.temp_block);
            if blocked_until > now {
                return Ok(AdmitDecision::Blocked(Block::new(
                    BlockKind::Temp,
                    blocked_until,
                    self.config.temp_block,
                    now,
                    TEMP_BLOCKED_MESSAGE,
                )));
            }
        }

        Ok(AdmitDecision::Admitted)
    }

    /// Date the current daily window is keyed under: the oldest earlier date
    /// whose counter is still alive, otherwise today.
    async fn daily_window_date(&self, ip: &str, now: DateTime<Utc>) -> Result<NaiveDate, AuthError> {
        let today = now.date_naive();
        let dates = recent_dates(today, span_days(self.config.daily_window));

        for date in dates.into_iter().skip(1).rev() {
            let key = keys::daily_attempts(ip, date);
            if self.call("daily_window_has", self.store.has(&key, now)).await? {
                return Ok(date);
            }
        }

        Ok(today)
    }

    async fn record_daily_attempt(&self, ip: &str, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let date = self.daily_window_date(ip, now).await?;
        let key = keys::daily_attempts(ip, date);

        let daily = self
            .call(
                "daily_increment",
                self.store.increment(&key, self.config.daily_window, Expiry::FromFirstHit, now),
            )
            .await?;
        Ok(daily.count)
    }

    /// Increments both counters for `ip` and returns their new values.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    pub async fn record_attempt(
        &self,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<AttemptCounts, AuthError> {
        let daily = self.record_daily_attempt(ip, now).await?;

        let short_term = self
            .call(
                "short_term_increment",
                self.store.increment(
                    &keys::short_term_attempts(ip),
                    self.config.short_term_window,
                    Expiry::Sliding,
                    now,
                ),
            )
            .await?;

        log::debug!(
            target: "turnstile_auth",
            "msg=\"login attempt recorded\", ip=\"{ip}\", daily={daily}, short_term={}",
            short_term.count
        );

        Ok(AttemptCounts {
            daily,
            short_term: short_term.count,
        })
    }

    /// Writes a block when a counter has crossed its limit.
    ///
    /// The daily limit is checked first; when both are crossed only the daily
    /// block is written.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    pub async fn evaluate_thresholds(
        &self,
        ip: &str,
        counts: AttemptCounts,
        now: DateTime<Utc>,
    ) -> Result<AdmitDecision, AuthError> {
        if counts.daily > self.config.daily_limit {
            let blocked_until = now + self.config.daily_block;
            self.call(
                "daily_block_put",
                self.store.put(
                    &keys::daily_block(ip, now.date_naive()),
                    &blocked_until.to_rfc3339(),
                    self.config.daily_block,
                    now,
                ),
            )
            .await?;

            log::warn!(
                target: "turnstile_auth",
                "msg=\"daily login limit exceeded\", ip=\"{ip}\", attempts={}, blocked_until=\"{}\"",
                counts.daily,
                blocked_until.to_rfc3339()
            );
            events::dispatch(AuthEvent::IpBlocked {
                ip: ip.to_owned(),
                kind: BlockKind::Daily,
                attempts: counts.daily,
                blocked_until,
                at: now,
            })
            .await;

            let message = format!(
                "You have exceeded the daily login attempt limit ({} attempts). Try again tomorrow.",
                self.config.daily_limit
            );
            let block = Block::new(
                BlockKind::Daily,
                blocked_until,
                self.config.daily_block,
                now,
                message,
            );
            return Ok(AdmitDecision::Blocked(block.triggered(Some(counts.daily))));
        }

        if counts.short_term > self.config.short_term_limit {
            let blocked_until = now + self.config.temp_block;
            self.call(
                "temp_block_put",
                self.store.put(
                    &keys::temp_block(ip),
                    &blocked_until.to_rfc3339(),
                    self.config.temp_block,
                    now,
                ),
            )
            .await?;

            log::warn!(
                target: "turnstile_auth",
                "msg=\"rapid login attempts\", ip=\"{ip}\", attempts={}, blocked_until=\"{}\"",
                counts.short_term,
                blocked_until.to_rfc3339()
            );
            events::dispatch(AuthEvent::IpBlocked {
                ip: ip.to_owned(),
                kind: BlockKind::Temp,
                attempts: counts.short_term,
                blocked_until,
                at: now,
            })
            .await;

            let message = format!(
                "Too many rapid login attempts. You are blocked for {}.",
                humanize(self.config.temp_block)
            );
            let block = Block::new(
                BlockKind::Temp,
                blocked_until,
                self.config.temp_block,
                now,
                message,
            );
            return Ok(AdmitDecision::Blocked(block.triggered(None)));
        }

        Ok(AdmitDecision::Admitted)
    }

    /// Runs the whole admission stage: check, count, evaluate.
    ///
    /// Requests refused by an active block still bump the daily counter,
    /// unless `count_blocked_attempts` is off. They never touch the burst
    /// counter. Store failures are resolved with the configured
    /// [`StoreFailurePolicy`].
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "guard_admit", skip(self), err))]
    pub async fn admit(&self, ip: &str, now: DateTime<Utc>) -> Result<AdmitDecision, AuthError> {
        let decision = match self.check_and_admit(ip, now).await {
            Ok(decision) => decision,
            Err(e) => return self.store_failure(ip, e, now).await,
        };

        if decision.is_blocked() {
            if self.config.count_blocked_attempts {
                if let Err(e) = self.record_daily_attempt(ip, now).await {
                    log::error!(
                        target: "turnstile_auth",
                        "msg=\"failed to count blocked attempt\", ip=\"{ip}\", error=\"{e}\""
                    );
                }
            }
            return Ok(decision);
        }

        let evaluated = match self.record_attempt(ip, now).await {
            Ok(counts) => self.evaluate_thresholds(ip, counts, now).await,
            Err(e) => Err(e),
        };

        match evaluated {
            Ok(decision) => Ok(decision),
            Err(e) => self.store_failure(ip, e, now).await,
        }
    }

    async fn store_failure(
        &self,
        ip: &str,
        error: AuthError,
        now: DateTime<Utc>,
    ) -> Result<AdmitDecision, AuthError> {
        let policy = self.config.on_store_failure;
        log::error!(
            target: "turnstile_auth",
            "msg=\"counter store failure\", ip=\"{ip}\", policy=\"{policy:?}\", error=\"{error}\""
        );
        events::dispatch(AuthEvent::GuardStoreFailure {
            ip: ip.to_owned(),
            error: error.to_string(),
            at: now,
        })
        .await;

        match policy {
            StoreFailurePolicy::FailOpen => Ok(AdmitDecision::Admitted),
            StoreFailurePolicy::FailClosed => Ok(AdmitDecision::Blocked(Block::new(
                BlockKind::Temp,
                now + self.config.temp_block,
                self.config.temp_block,
                now,
                STORE_DOWN_MESSAGE,
            ))),
            StoreFailurePolicy::Unavailable => Err(match error {
                AuthError::StoreUnavailable(msg) => AuthError::StoreUnavailable(msg),
                other => AuthError::StoreUnavailable(other.to_string()),
            }),
        }
    }

    /// Clears the burst counter and temp block for `ip`.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    pub async fn on_login_success(&self, ip: &str) -> Result<(), AuthError> {
        self.call(
            "short_term_forget",
            self.store.forget(&keys::short_term_attempts(ip)),
        )
        .await?;
        self.call("temp_block_forget", self.store.forget(&keys::temp_block(ip)))
            .await?;

        log::debug!(target: "turnstile_auth", "msg=\"login guard reset\", ip=\"{ip}\"");
        Ok(())
    }

    /// Logs a failed credential check and returns the current burst count.
    /// The counters were already bumped by [`record_attempt`](Self::record_attempt).
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    pub async fn on_login_failure(
        &self,
        ip: &str,
        account: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, AuthError> {
        let attempts = self.short_term_attempts(ip, now).await?;

        log::warn!(
            target: "turnstile_auth",
            "msg=\"failed login attempt\", attempt={attempts}, account=\"{account}\", ip=\"{ip}\""
        );
        Ok(attempts)
    }

    pub async fn short_term_attempts(&self, ip: &str, now: DateTime<Utc>) -> Result<u64, AuthError> {
        self.call(
            "short_term_count",
            self.store.count(&keys::short_term_attempts(ip), now),
        )
        .await
    }

    /// Attempts counted in the current daily window.
    pub async fn daily_attempts(&self, ip: &str, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let date = self.daily_window_date(ip, now).await?;
        self.call(
            "daily_count",
            self.store.count(&keys::daily_attempts(ip, date), now),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn guard() -> (AbuseGuard, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (AbuseGuard::new(store.clone()), store)
    }

    #[test]
    fn test_span_days() {
        assert_eq!(span_days(Duration::hours(24)), 1);
        assert_eq!(span_days(Duration::hours(25)), 2);
        assert_eq!(span_days(Duration::minutes(5)), 1);
        assert_eq!(span_days(Duration::zero()), 0);
    }

    #[test]
    fn test_recent_dates() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(
            recent_dates(today, 1),
            vec![today, NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()]
        );
    }

    #[tokio::test]
    async fn test_fresh_ip_is_admitted() {
        let (guard, store) = guard();
        let now = at("2026-03-01T10:00:00Z");

        assert_eq!(
            guard.check_and_admit("1.2.3.4", now).await.unwrap(),
            AdmitDecision::Admitted
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_record_attempt_uses_key_layout() {
        let (guard, store) = guard();
        let now = at("2026-03-01T10:00:00Z");

        let counts = guard.record_attempt("1.2.3.4", now).await.unwrap();
        assert_eq!(counts, AttemptCounts { daily: 1, short_term: 1 });

        assert_eq!(
            store
                .count("daily_login_attempts:1.2.3.4:2026-03-01", now)
                .await
                .unwrap(),
            1
        );
        assert_eq!(store.count("login_attempts:1.2.3.4", now).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_temp_block_written_past_limit() {
        let (guard, store) = guard();
        let now = at("2026-03-01T10:00:00Z");
        let counts = AttemptCounts { daily: 4, short_term: 4 };

        let decision = guard.evaluate_thresholds("1.2.3.4", counts, now).await.unwrap();
        let block = decision.block().unwrap();

        assert_eq!(block.kind, BlockKind::Temp);
        assert_eq!(block.retry_after, 300);
        assert!(block.newly_triggered);
        assert_eq!(
            block.message,
            "Too many rapid login attempts. You are blocked for 5 minutes."
        );
        assert_eq!(
            store.get("temp_blocked_ip:1.2.3.4", now).await.unwrap().as_deref(),
            Some("2026-03-01T10:05:00+00:00")
        );
    }

    #[tokio::test]
    async fn test_daily_wins_over_temp() {
        let (guard, store) = guard();
        let now = at("2026-03-01T10:00:00Z");
        let counts = AttemptCounts { daily: 7, short_term: 7 };

        let decision = guard.evaluate_thresholds("1.2.3.4", counts, now).await.unwrap();
        let block = decision.block().unwrap();

        assert_eq!(block.kind, BlockKind::Daily);
        assert_eq!(block.retry_after, 86400);
        assert_eq!(block.daily_attempts, Some(7));
        assert!(store.has("daily_blocked_ip:1.2.3.4:2026-03-01", now).await.unwrap());
        assert!(!store.has("temp_blocked_ip:1.2.3.4", now).await.unwrap());
    }

    #[tokio::test]
    async fn test_at_limit_is_admitted() {
        let (guard, _) = guard();
        let now = at("2026-03-01T10:00:00Z");
        let counts = AttemptCounts { daily: 6, short_term: 3 };

        assert_eq!(
            guard.evaluate_thresholds("1.2.3.4", counts, now).await.unwrap(),
            AdmitDecision::Admitted
        );
    }

    #[tokio::test]
    async fn test_unparseable_block_value_still_blocks() {
        let (guard, store) = guard();
        let now = at("2026-03-01T10:00:00Z");
        store
            .put("temp_blocked_ip:1.2.3.4", "1", Duration::minutes(5), now)
            .await
            .unwrap();

        let decision = guard.check_and_admit("1.2.3.4", now).await.unwrap();
        assert_eq!(decision.block().unwrap().retry_after, 300);
    }

    #[tokio::test]
    async fn test_success_clears_burst_state_only() {
        let (guard, store) = guard();
        let now = at("2026-03-01T10:00:00Z");

        for _ in 0..4 {
            guard.admit("1.2.3.4", now).await.unwrap();
        }
        assert!(store.has("temp_blocked_ip:1.2.3.4", now).await.unwrap());

        guard.on_login_success("1.2.3.4").await.unwrap();

        assert!(!store.has("temp_blocked_ip:1.2.3.4", now).await.unwrap());
        assert_eq!(guard.short_term_attempts("1.2.3.4", now).await.unwrap(), 0);
        assert_eq!(guard.daily_attempts("1.2.3.4", now).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_refused_attempts_only_count_daily() {
        let (guard, _) = guard();
        let now = at("2026-03-01T10:00:00Z");

        for _ in 0..4 {
            guard.admit("1.2.3.4", now).await.unwrap();
        }
        let later = now + Duration::minutes(2);
        assert!(guard.admit("1.2.3.4", later).await.unwrap().is_blocked());
        assert!(guard.admit("1.2.3.4", later).await.unwrap().is_blocked());

        assert_eq!(guard.daily_attempts("1.2.3.4", later).await.unwrap(), 6);
        assert_eq!(guard.short_term_attempts("1.2.3.4", later).await.unwrap(), 4);

        // burst counter was last touched at `now`, so it is gone with the block
        let after = now + Duration::minutes(5) + Duration::seconds(1);
        assert_eq!(guard.short_term_attempts("1.2.3.4", after).await.unwrap(), 0);
        assert_eq!(guard.check_and_admit("1.2.3.4", after).await.unwrap(), AdmitDecision::Admitted);
    }

    #[tokio::test]
    async fn test_on_login_failure_is_read_only() {
        let (guard, _) = guard();
        let now = at("2026-03-01T10:00:00Z");

        guard.record_attempt("1.2.3.4", now).await.unwrap();
        assert_eq!(guard.on_login_failure("1.2.3.4", "admin", now).await.unwrap(), 1);
        assert_eq!(guard.on_login_failure("1.2.3.4", "admin", now).await.unwrap(), 1);
    }
}
