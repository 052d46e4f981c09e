use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actions::LoginSuccess;
use crate::guard::{Block, BlockKind};
use crate::{AuthError, AuthUser, SecretString};

// Request DTOs
//
// Missing fields deserialize as empty so the actions report them as
// validation errors rather than the extractor rejecting the body.

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: SecretString,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: SecretString,
    #[serde(default)]
    pub password_confirmation: SecretString,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub password: Option<SecretString>,
}

// Response DTOs

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: SecretString,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponse")
            .field("token", &"[REDACTED]")
            .field("email", &self.email)
            .field("roles", &self.roles)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl From<LoginSuccess> for LoginResponse {
    fn from(success: LoginSuccess) -> Self {
        LoginResponse {
            token: success.token,
            name: success.user.name,
            email: success.user.email,
            roles: success.roles,
            expires_at: success.expires_at,
        }
    }
}

/// Body of a 429 from the login guard.
#[derive(Debug, Serialize)]
pub struct BlockedResponse {
    pub message: String,
    pub kind: BlockKind,
    pub blocked_until: DateTime<Utc>,
    /// Seconds until `blocked_until`.
    pub retry_after: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_attempts: Option<u64>,
}

impl From<Block> for BlockedResponse {
    fn from(block: Block) -> Self {
        BlockedResponse {
            message: block.message,
            kind: block.kind,
            blocked_until: block.blocked_until,
            retry_after: block.retry_after,
            daily_attempts: block.daily_attempts,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_id: Option<i64>,
}

impl From<AuthUser> for UserResponse {
    fn from(user: AuthUser) -> Self {
        UserResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            role_id: user.role_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: String,
}

impl From<AuthError> for ErrorResponse {
    fn from(err: AuthError) -> Self {
        let code = match &err {
            AuthError::UserNotFound => "USER_NOT_FOUND",
            AuthError::UserAlreadyExists => "USER_ALREADY_EXISTS",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::PasswordHashError => "PASSWORD_HASH_ERROR",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::TokenInvalid => "TOKEN_INVALID",
            AuthError::Forbidden => "FORBIDDEN",
            AuthError::NotFound => "NOT_FOUND",
            AuthError::TooManyRequests { .. } => "RATE_LIMITED",
            AuthError::Validation(_) => "VALIDATION_ERROR",
            AuthError::ConfigurationError(_) => "CONFIGURATION_ERROR",
            AuthError::DatabaseError(_) => "DATABASE_ERROR",
            AuthError::StoreUnavailable(_) => "SERVICE_UNAVAILABLE",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        };

        // internal details stay in the logs
        let message = match &err {
            AuthError::DatabaseError(_)
            | AuthError::ConfigurationError(_)
            | AuthError::PasswordHashError
            | AuthError::Internal(_) => "Internal server error".to_owned(),
            AuthError::StoreUnavailable(_) => "Service temporarily unavailable".to_owned(),
            AuthError::TooManyRequests { .. } => "Too many requests. Try again later.".to_owned(),
            _ => err.to_string(),
        };

        ErrorResponse {
            message,
            code: code.to_owned(),
        }
    }
}
