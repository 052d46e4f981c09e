//! Guarded login scenarios against the in-memory counter store.
//!
//! Run with: `cargo test --features mocks --test login_abuse`

#![cfg(feature = "mocks")]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use turnstile::actions::{LoginAction, LoginOutcome};
use turnstile::config::{GuardConfig, StoreFailurePolicy};
use turnstile::crypto::{Argon2Hasher, PasswordHasher};
use turnstile::jwt::{JwtConfig, JwtService};
use turnstile::store::{CounterInfo, CounterStore, Expiry};
use turnstile::{
    AbuseGuard, AdmitDecision, AuthError, AuthUser, BlockKind, InMemoryStore, MockRoleRepository,
    MockUserRepository, SecretString,
};

type Login = LoginAction<MockUserRepository, MockRoleRepository, JwtService>;

const PASSWORD: &str = "Passw0rd!";

fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn login_action(guard: AbuseGuard) -> Login {
    let hasher = Arc::new(Argon2Hasher::new(1024, 1, 1));
    let hash = hasher.hash(&SecretString::new(PASSWORD)).unwrap();

    let users = MockUserRepository::with_users(vec![
        AuthUser::mock_from_credentials("admin@example.com", &hash)
            .with_id(1)
            .with_name("Admin"),
    ]);
    let roles = MockRoleRepository::new();
    roles.assign(1, "admin");

    let jwt = JwtService::new(JwtConfig::new("test-secret-32-bytes-long-key-00").unwrap());
    LoginAction::new(guard, users, roles, jwt).with_hasher(hasher)
}

fn setup() -> (Login, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    (login_action(AbuseGuard::new(store.clone())), store)
}

async fn fail(action: &Login, ip: &str, now: DateTime<Utc>) -> LoginOutcome {
    action
        .execute("admin@example.com", &SecretString::new("wrong"), ip, now)
        .await
        .unwrap()
}

async fn succeed(action: &Login, ip: &str, now: DateTime<Utc>) -> LoginOutcome {
    action
        .execute("admin@example.com", &SecretString::new(PASSWORD), ip, now)
        .await
        .unwrap()
}

fn expect_block(outcome: LoginOutcome) -> turnstile::Block {
    match outcome {
        LoginOutcome::Blocked(block) => block,
        other => panic!("expected a block, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rapid_failures_trigger_temp_block() {
    let (action, _) = setup();
    let t = at("2026-03-01T10:00:00Z");

    for (i, secs) in [0, 15, 30].into_iter().enumerate() {
        let outcome = fail(&action, "1.2.3.4", t + Duration::seconds(secs)).await;
        assert!(
            matches!(outcome, LoginOutcome::InvalidCredentials { attempts } if attempts == i as u64 + 1),
            "attempt {i}: {outcome:?}"
        );
    }

    let block = expect_block(fail(&action, "1.2.3.4", t + Duration::seconds(45)).await);
    assert_eq!(block.kind, BlockKind::Temp);
    assert_eq!(block.retry_after, 300);
    assert_eq!(block.block_secs, 300);
    assert!(block.newly_triggered);
    assert_eq!(block.blocked_until, t + Duration::seconds(45) + Duration::minutes(5));

    // other IPs are unaffected
    assert!(matches!(
        succeed(&action, "9.9.9.9", t + Duration::seconds(50)).await,
        LoginOutcome::Success(_)
    ));

    // the right password is refused until the block runs out
    let block = expect_block(succeed(&action, "1.2.3.4", t + Duration::minutes(2)).await);
    assert!(!block.newly_triggered);
    assert_eq!(block.message, "Too many rapid attempts. You are temporarily blocked.");
}

#[tokio::test]
async fn test_seventh_attempt_in_a_day_triggers_daily_block() {
    let (action, _) = setup();
    let t = at("2026-03-01T08:00:00Z");

    // spread out so the burst limit never fires
    for i in 0..6 {
        let outcome = fail(&action, "5.6.7.8", t + Duration::minutes(20 * i)).await;
        assert!(matches!(outcome, LoginOutcome::InvalidCredentials { attempts: 1 }));
    }

    let seventh = t + Duration::hours(3);
    let block = expect_block(fail(&action, "5.6.7.8", seventh).await);
    assert_eq!(block.kind, BlockKind::Daily);
    assert_eq!(block.retry_after, 86_400);
    assert_eq!(block.daily_attempts, Some(7));
    assert_eq!(block.blocked_until, seventh + Duration::hours(24));
    assert_eq!(
        block.message,
        "You have exceeded the daily login attempt limit (6 attempts). Try again tomorrow."
    );

    let later = expect_block(succeed(&action, "5.6.7.8", seventh + Duration::hours(20)).await);
    assert_eq!(later.kind, BlockKind::Daily);
    assert_eq!(later.retry_after, 4 * 3600);
}

#[tokio::test]
async fn test_success_resets_short_term_counter() {
    let (action, _) = setup();
    let t = at("2026-03-01T10:00:00Z");

    fail(&action, "2.2.2.2", t).await;
    fail(&action, "2.2.2.2", t + Duration::seconds(10)).await;
    assert!(matches!(
        succeed(&action, "2.2.2.2", t + Duration::seconds(20)).await,
        LoginOutcome::Success(_)
    ));

    let outcome = fail(&action, "2.2.2.2", t + Duration::seconds(30)).await;
    assert!(matches!(outcome, LoginOutcome::InvalidCredentials { attempts: 1 }));
}

#[tokio::test]
async fn test_temp_block_expires_without_retries() {
    let (action, _) = setup();
    let t = at("2026-03-01T10:00:00Z");

    for secs in 0..4 {
        fail(&action, "1.3.5.7", t + Duration::seconds(secs)).await;
    }
    let until = t + Duration::seconds(3) + Duration::minutes(5);

    let outcome = succeed(&action, "1.3.5.7", until + Duration::seconds(1)).await;
    assert!(matches!(outcome, LoginOutcome::Success(_)), "{outcome:?}");
}

#[tokio::test]
async fn test_retry_during_temp_block_does_not_extend_it() {
    let (action, _) = setup();
    let t = at("2026-03-01T10:00:00Z");

    for secs in 0..4 {
        fail(&action, "2.4.6.0", t + Duration::seconds(secs)).await;
    }

    let block = expect_block(succeed(&action, "2.4.6.0", t + Duration::minutes(3)).await);
    assert_eq!(block.kind, BlockKind::Temp);
    assert!(!block.newly_triggered);

    let outcome = succeed(&action, "2.4.6.0", t + Duration::minutes(5) + Duration::seconds(10)).await;
    assert!(matches!(outcome, LoginOutcome::Success(_)), "{outcome:?}");

    // the refused retry still counted toward the daily budget
    assert_eq!(
        action
            .guard()
            .daily_attempts("2.4.6.0", t + Duration::minutes(6))
            .await
            .unwrap(),
        6
    );
}

#[tokio::test]
async fn test_daily_block_expires_after_a_day() {
    let (action, _) = setup();
    let t0 = at("2026-03-01T08:00:00Z");

    for i in 0..6 {
        fail(&action, "3.3.3.3", t0 + Duration::minutes(30 * i)).await;
    }
    let t = t0 + Duration::hours(3);
    let block = expect_block(fail(&action, "3.3.3.3", t).await);
    assert_eq!(block.kind, BlockKind::Daily);

    let still = expect_block(succeed(&action, "3.3.3.3", t + Duration::hours(23)).await);
    assert_eq!(still.kind, BlockKind::Daily);

    let outcome = succeed(&action, "3.3.3.3", t + Duration::hours(24) + Duration::seconds(1)).await;
    assert!(matches!(outcome, LoginOutcome::Success(_)), "{outcome:?}");
}

#[tokio::test]
async fn test_email_match_is_case_insensitive() {
    let (action, _) = setup();

    let outcome = action
        .execute(
            "Admin@Example.COM",
            &SecretString::new(PASSWORD),
            "4.4.4.4",
            Utc::now(),
        )
        .await
        .unwrap();

    let LoginOutcome::Success(success) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(success.user.email, "admin@example.com");
    assert_eq!(success.roles, vec!["admin"]);
}

#[tokio::test]
async fn test_success_does_not_reset_daily_counter() {
    let (action, _) = setup();
    let t = at("2026-03-01T08:00:00Z");

    for i in 0..5 {
        fail(&action, "6.6.6.6", t + Duration::minutes(10 * i)).await;
    }
    assert!(matches!(
        succeed(&action, "6.6.6.6", t + Duration::minutes(60)).await,
        LoginOutcome::Success(_)
    ));

    let block = expect_block(fail(&action, "6.6.6.6", t + Duration::minutes(70)).await);
    assert_eq!(block.kind, BlockKind::Daily);
}

#[tokio::test]
async fn test_check_and_admit_is_read_only() {
    let store = Arc::new(InMemoryStore::new());
    let guard = AbuseGuard::new(store.clone());
    let t = at("2026-03-01T10:00:00Z");

    for _ in 0..4 {
        guard.admit("7.7.7.7", t).await.unwrap();
    }
    let entries = store.len();
    let first = guard.check_and_admit("7.7.7.7", t).await.unwrap();

    for _ in 0..10 {
        assert_eq!(guard.check_and_admit("7.7.7.7", t).await.unwrap(), first);
    }
    assert!(first.is_blocked());
    assert_eq!(store.len(), entries);
    assert_eq!(guard.short_term_attempts("7.7.7.7", t).await.unwrap(), 4);
}

#[tokio::test]
async fn test_daily_window_spans_midnight() {
    let (action, _) = setup();
    let t = at("2026-03-01T23:30:00Z");

    for i in 0..6 {
        fail(&action, "8.8.8.8", t + Duration::minutes(10 * i)).await;
    }

    let block = expect_block(fail(&action, "8.8.8.8", t + Duration::minutes(60)).await);
    assert_eq!(block.kind, BlockKind::Daily);
    assert_eq!(block.daily_attempts, Some(7));

    // still blocked the next calendar day
    let next_day = at("2026-03-03T00:20:00Z");
    let block = expect_block(succeed(&action, "8.8.8.8", next_day).await);
    assert_eq!(block.kind, BlockKind::Daily);
    assert_eq!(block.retry_after, 600);
}

#[tokio::test]
async fn test_blocked_attempts_are_not_counted_when_disabled() {
    let store = Arc::new(InMemoryStore::new());
    let guard = AbuseGuard::with_config(
        store.clone(),
        GuardConfig {
            count_blocked_attempts: false,
            ..Default::default()
        },
    );
    let t = at("2026-03-01T10:00:00Z");

    for _ in 0..4 {
        guard.admit("1.1.1.1", t).await.unwrap();
    }
    for _ in 0..5 {
        assert!(guard.admit("1.1.1.1", t).await.unwrap().is_blocked());
    }

    assert_eq!(guard.daily_attempts("1.1.1.1", t).await.unwrap(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_attempts_are_all_counted() {
    let store = Arc::new(InMemoryStore::new());
    let guard = AbuseGuard::new(store.clone());
    let t = at("2026-03-01T10:00:00Z");

    let mut handles = Vec::new();
    for _ in 0..20 {
        let guard = guard.clone();
        handles.push(tokio::spawn(async move { guard.admit("2.4.6.8", t).await.unwrap() }));
    }

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap() == AdmitDecision::Admitted {
            admitted += 1;
        }
    }

    assert!(admitted <= 3, "{admitted} admitted");
    assert_eq!(guard.daily_attempts("2.4.6.8", t).await.unwrap(), 20);

    // requests that saw the temp block only counted toward the daily budget
    let short_term = guard.short_term_attempts("2.4.6.8", t).await.unwrap();
    assert!((4..=20).contains(&short_term), "{short_term}");
}

/// Fails every call, or hangs when `slow` is set.
struct BrokenStore {
    slow: bool,
}

impl BrokenStore {
    async fn fail<T>(&self) -> Result<T, AuthError> {
        if self.slow {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        }
        Err(AuthError::StoreUnavailable("connection refused".to_owned()))
    }
}

#[async_trait]
impl CounterStore for BrokenStore {
    async fn increment(
        &self,
        _key: &str,
        _ttl: Duration,
        _expiry: Expiry,
        _now: DateTime<Utc>,
    ) -> Result<CounterInfo, AuthError> {
        self.fail().await
    }

    async fn count(&self, _key: &str, _now: DateTime<Utc>) -> Result<u64, AuthError> {
        self.fail().await
    }

    async fn put(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Duration,
        _now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        self.fail().await
    }

    async fn get(&self, _key: &str, _now: DateTime<Utc>) -> Result<Option<String>, AuthError> {
        self.fail().await
    }

    async fn forget(&self, _key: &str) -> Result<(), AuthError> {
        self.fail().await
    }
}

fn broken_guard(policy: StoreFailurePolicy, slow: bool) -> AbuseGuard {
    AbuseGuard::with_config(
        Arc::new(BrokenStore { slow }),
        GuardConfig {
            on_store_failure: policy,
            store_timeout: std::time::Duration::from_millis(50),
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn test_fail_open_lets_login_through() {
    let action = login_action(broken_guard(StoreFailurePolicy::FailOpen, false));

    assert!(matches!(
        succeed(&action, "1.2.3.4", Utc::now()).await,
        LoginOutcome::Success(_)
    ));
    assert!(matches!(
        fail(&action, "1.2.3.4", Utc::now()).await,
        LoginOutcome::InvalidCredentials { attempts: 0 }
    ));
}

#[tokio::test]
async fn test_fail_closed_refuses_login() {
    let action = login_action(broken_guard(StoreFailurePolicy::FailClosed, false));

    let block = expect_block(succeed(&action, "1.2.3.4", Utc::now()).await);
    assert_eq!(block.kind, BlockKind::Temp);
    assert_eq!(block.message, "Login is temporarily unavailable. Try again later.");
}

#[tokio::test]
async fn test_unavailable_policy_surfaces_error() {
    let action = login_action(broken_guard(StoreFailurePolicy::Unavailable, false));

    let result = action
        .execute("admin@example.com", &SecretString::new(PASSWORD), "1.2.3.4", Utc::now())
        .await;
    assert!(matches!(result, Err(AuthError::StoreUnavailable(_))));
}

#[tokio::test]
async fn test_slow_store_times_out() {
    let guard = broken_guard(StoreFailurePolicy::Unavailable, true);

    let started = std::time::Instant::now();
    let result = guard.admit("1.2.3.4", Utc::now()).await;

    let Err(AuthError::StoreUnavailable(msg)) = result else {
        panic!("expected store failure, got {result:?}");
    };
    assert!(msg.contains("timed out"), "{msg}");
    assert!(started.elapsed() < std::time::Duration::from_secs(2));
}
