#![allow(
    clippy::print_stdout,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items
)]

//! In-memory Turnstile server.
//!
//! Everything lives in process memory: users, roles and guard counters. Two
//! accounts are seeded, both with the password `Passw0rd!`.
//!
//! Run with: `cargo run --example memory_server --features "axum_support mocks"`
//!
//! Try the guard:
//!   for i in 1 2 3 4; do
//!     curl -i -X POST http://localhost:8080/auth/login \
//!       -H "Content-Type: application/json" \
//!       -d '{"email": "admin@example.com", "password": "wrong"}'
//!   done
//!
//! The fourth request answers 429 with `Retry-After: 300`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use turnstile::api::axum::{AppState, router};
use turnstile::crypto::{Argon2Hasher, PasswordHasher};
use turnstile::events::listeners::LoggingListener;
use turnstile::events::register_event_listeners;
use turnstile::jwt::{JwtConfig, JwtService};
use turnstile::{
    AuthUser, InMemoryStore, MockRoleRepository, MockUserRepository, SecretString,
    TurnstileConfig,
};

#[tokio::main]
async fn main() {
    let jwt_secret = std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| "demo-secret-key-at-least-32-bytes!".to_owned());
    let config = TurnstileConfig::new();
    let jwt = JwtService::new(JwtConfig::from_token_config(jwt_secret, &config.tokens).unwrap());

    let hasher = Arc::new(Argon2Hasher::default());
    let hash = hasher.hash(&SecretString::new("Passw0rd!")).unwrap();

    let users = MockUserRepository::with_users(vec![
        AuthUser::mock_from_credentials("admin@example.com", &hash)
            .with_id(1)
            .with_name("Admin"),
        AuthUser::mock_from_credentials("superadmin@example.com", &hash)
            .with_id(2)
            .with_name("Super Admin"),
    ]);
    let roles = MockRoleRepository::new();
    roles.assign(1, "admin");
    roles.assign(2, "superadmin");

    register_event_listeners(|registry| {
        registry.listen(LoggingListener::new());
    });

    let store = Arc::new(InMemoryStore::new());

    store.spawn_cleanup(Duration::from_secs(60));

    let state = AppState::new(users, roles, jwt, store, config).with_hasher(hasher);

    println!("Starting in-memory turnstile server on http://localhost:8080");
    println!("Endpoints:");
    println!("  POST /auth/login          - Login (guarded)");
    println!("  POST /auth/register       - Create account");
    println!("  PUT  /profile/update      - Update own profile");
    println!("  GET  /profile/secure      - Own profile");
    println!("  GET  /profile/secure/{{id}} - Own profile by id");
    println!("  GET  /profile/{{id}}        - Any profile");

    let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
