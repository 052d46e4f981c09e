//! Login abuse mitigation for HTTP backends.
//!
//! `turnstile` puts an IP-based [`AbuseGuard`](guard::AbuseGuard) in front of
//! credential verification: a daily attempt budget and a short-term burst limit,
//! each escalating to a time-bound block, backed by a pluggable
//! [`CounterStore`](store::CounterStore). The [`LoginAction`](actions::LoginAction)
//! ties the guard, the user repository and the JWT issuer together, and the
//! optional axum layer exposes it over HTTP.

pub mod actions;
pub mod api;
pub mod config;
pub mod crypto;
pub mod events;
pub mod guard;
pub mod jwt;
pub mod repository;
pub mod secret;
pub mod store;
pub mod validators;

#[cfg(feature = "sqlx_postgres")]
pub mod postgres;

pub use actions::{LoginAction, LoginOutcome, LoginSuccess};
pub use config::{GuardConfig, StoreFailurePolicy, TokenConfig, TurnstileConfig};
pub use guard::{AbuseGuard, AdmitDecision, Block, BlockKind};
pub use repository::{AuthUser, RoleRepository, UserRepository};
pub use secret::SecretString;
pub use store::{CounterStore, InMemoryStore};

#[cfg(any(test, feature = "mocks"))]
pub use repository::{MockRoleRepository, MockUserRepository};

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    UserNotFound,
    UserAlreadyExists,
    InvalidCredentials,
    PasswordHashError,
    TokenExpired,
    TokenInvalid,
    Forbidden,
    NotFound,
    TooManyRequests {
        retry_after: u64,
    },
    Validation(String),
    ConfigurationError(String),
    DatabaseError(String),
    /// The counter store could not be reached or timed out.
    StoreUnavailable(String),
    Internal(String),
}

impl std::error::Error for AuthError {}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::UserNotFound => write!(f, "User not found"),
            AuthError::UserAlreadyExists => write!(f, "User already exists"),
            AuthError::InvalidCredentials => write!(f, "Invalid email or password"),
            AuthError::PasswordHashError => write!(f, "Failed to hash password"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenInvalid => write!(f, "Invalid token"),
            AuthError::Forbidden => write!(f, "Forbidden"),
            AuthError::NotFound => write!(f, "Not found"),
            AuthError::TooManyRequests { retry_after } => {
                write!(f, "Too many requests, retry after {retry_after} seconds")
            }
            AuthError::Validation(msg) => write!(f, "{msg}"),
            AuthError::ConfigurationError(msg) => write!(f, "Configuration error: {msg}"),
            AuthError::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            AuthError::StoreUnavailable(msg) => write!(f, "Counter store unavailable: {msg}"),
            AuthError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid email or password"
        );
        assert_eq!(
            AuthError::TooManyRequests { retry_after: 60 }.to_string(),
            "Too many requests, retry after 60 seconds"
        );
        assert_eq!(
            AuthError::Validation("The email field is required.".to_owned()).to_string(),
            "The email field is required."
        );
    }
}
