use chrono::{DateTime, Utc};

use crate::AuthError;
use crate::repository::AuthUser;
use crate::secret::SecretString;

/// A freshly minted access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: SecretString,
    pub expires_at: DateTime<Utc>,
}

/// Mints and verifies time-bound identity tokens.
///
/// [`JwtService`](super::JwtService) is the built-in implementation.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user: &AuthUser, now: DateTime<Utc>) -> Result<IssuedToken, AuthError>;

    /// Returns the user id carried by a valid token.
    ///
    /// # Errors
    ///
    /// `AuthError::TokenExpired` or `AuthError::TokenInvalid`.
    fn verify(&self, token: &str) -> Result<i64, AuthError>;
}
