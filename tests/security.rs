//! Security-focused test suite.
//!
//! Run with: `cargo test --features mocks --test security`

#![cfg(feature = "mocks")]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use turnstile::actions::{LoginAction, LoginOutcome};
use turnstile::crypto::{Argon2Hasher, PasswordHasher};
use turnstile::jwt::{JwtConfig, JwtService, TokenIssuer};
use turnstile::validators::PasswordPolicy;
use turnstile::{
    AbuseGuard, AuthError, AuthUser, InMemoryStore, MockRoleRepository, MockUserRepository,
    SecretString, TurnstileConfig,
};

const SECRET: &str = "test-secret-key-for-jwt-testing!!";

// =============================================================================
// Password Security Tests
// =============================================================================

#[test]
fn argon2_produces_different_hashes_for_same_password() {
    let hasher = Argon2Hasher::new(1024, 1, 1);
    let password = SecretString::new("Passw0rd!");

    let hash1 = hasher.hash(&password).unwrap();
    let hash2 = hasher.hash(&password).unwrap();

    // random salt
    assert_ne!(hash1, hash2);
    assert!(hasher.verify(&password, &hash1).unwrap());
    assert!(hasher.verify(&password, &hash2).unwrap());
}

#[test]
fn argon2_hashes_verify_across_presets() {
    let hash = Argon2Hasher::new(1024, 1, 1)
        .hash(&SecretString::new("Passw0rd!"))
        .unwrap();

    assert!(
        Argon2Hasher::production()
            .verify(&SecretString::new("Passw0rd!"), &hash)
            .unwrap()
    );
}

#[test]
fn malformed_hash_is_an_error_not_a_match() {
    let result = Argon2Hasher::default().verify(&SecretString::new("x"), "not-a-phc-string");
    assert_eq!(result, Err(AuthError::PasswordHashError));
}

#[test]
fn registration_policy_requires_complexity() {
    let policy = PasswordPolicy::registration();

    assert!(policy.validate("short1!").is_err());
    assert!(policy.validate("alllowercase1!").is_err());
    assert!(policy.validate("ALLUPPERCASE1!").is_err());
    assert!(policy.validate("NoDigitsHere!").is_err());
    assert!(policy.validate("NoSpecial123").is_err());
    assert!(policy.validate("Passw0rd!").is_ok());
}

#[test]
fn secret_string_redacts_in_debug_and_display() {
    let secret = SecretString::new("Passw0rd!");

    assert!(!format!("{secret:?}").contains("Passw0rd!"));
    assert!(!format!("{secret}").contains("Passw0rd!"));
    assert_eq!(secret.expose_secret(), "Passw0rd!");
}

// =============================================================================
// JWT Security Tests
// =============================================================================

#[test]
fn jwt_config_rejects_short_secret() {
    assert!(JwtConfig::new("short-secret").is_err());
    assert!(JwtConfig::new("exactly-31-bytes-not-enough!!!!").is_err());
    assert!(JwtConfig::new("exactly-32-bytes-is-good-enough!").is_ok());
}

#[test]
fn jwt_debug_hides_secret() {
    let config = JwtConfig::new(SECRET).unwrap();
    assert!(!format!("{config:?}").contains(SECRET));
}

#[test]
fn jwt_tokens_have_unique_jti() {
    let service = JwtService::new(JwtConfig::new(SECRET).unwrap());
    let now = Utc::now();

    let (first, _) = service.encode(1, now).unwrap();
    let (second, _) = service.encode(1, now).unwrap();

    let first = service.decode(&first).unwrap();
    let second = service.decode(&second).unwrap();
    assert!(!first.jti.is_empty());
    assert_ne!(first.jti, second.jti);
}

#[test]
fn jwt_tampered_tokens_rejected() {
    let service = JwtService::new(JwtConfig::new(SECRET).unwrap());
    let (token, _) = service.encode(1, Utc::now()).unwrap();

    let signature_start = token.rfind('.').unwrap() + 1;
    let mut tampered = token.into_bytes();
    tampered[signature_start] = if tampered[signature_start] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();

    assert_eq!(service.verify(&tampered), Err(AuthError::TokenInvalid));
}

#[test]
fn jwt_from_other_secret_rejected() {
    let ours = JwtService::new(JwtConfig::new(SECRET).unwrap());
    let theirs = JwtService::new(JwtConfig::new("another-secret-key-for-jwt-tests!").unwrap());

    let (token, _) = theirs.encode(1, Utc::now()).unwrap();
    assert_eq!(ours.verify(&token), Err(AuthError::TokenInvalid));
}

#[test]
fn jwt_expired_tokens_rejected() {
    let service = JwtService::new(JwtConfig::new(SECRET).unwrap());
    let (token, _) = service.encode(1, Utc::now() - Duration::hours(2)).unwrap();

    assert_eq!(service.verify(&token), Err(AuthError::TokenExpired));
}

// =============================================================================
// Login Tests
// =============================================================================

#[tokio::test]
async fn unknown_user_and_wrong_password_look_the_same() {
    let hasher = Arc::new(Argon2Hasher::new(1024, 1, 1));
    let hash = hasher.hash(&SecretString::new("Passw0rd!")).unwrap();
    let users = MockUserRepository::with_users(vec![AuthUser::mock_from_credentials(
        "admin@example.com",
        &hash,
    )]);
    let action = LoginAction::new(
        AbuseGuard::new(Arc::new(InMemoryStore::new())),
        users,
        MockRoleRepository::new(),
        JwtService::new(JwtConfig::new(SECRET).unwrap()),
    )
    .with_hasher(hasher);

    let now = Utc::now();
    let wrong = action
        .execute("admin@example.com", &SecretString::new("nope"), "10.0.0.1", now)
        .await
        .unwrap();
    let unknown = action
        .execute("ghost@example.com", &SecretString::new("nope"), "10.0.0.2", now)
        .await
        .unwrap();

    assert!(matches!(wrong, LoginOutcome::InvalidCredentials { attempts: 1 }));
    assert!(matches!(unknown, LoginOutcome::InvalidCredentials { attempts: 1 }));
}

#[test]
fn strict_config_tightens_defaults() {
    let default = TurnstileConfig::default();
    let strict = TurnstileConfig::strict();

    assert!(strict.tokens.access_token_expiry < default.tokens.access_token_expiry);
    assert!(strict.throttle.max_requests < default.throttle.max_requests);
    assert!(!strict.trust_proxy_headers);
}
