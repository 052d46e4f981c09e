use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::AuthError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub role_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(any(test, feature = "mocks"))]
impl AuthUser {
    pub fn mock() -> Self {
        Self::mock_from_credentials("test@example.com", "fakehashedpassword")
    }

    pub fn mock_from_credentials(email: &str, hashed_password: &str) -> Self {
        let now = Utc::now();
        AuthUser {
            id: 1,
            name: "Test User".to_owned(),
            email: email.to_owned(),
            hashed_password: hashed_password.to_owned(),
            role_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        name.clone_into(&mut self.name);
        self
    }
}

/// Fields changed by a profile update. `None` leaves the column alone.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub hashed_password: Option<String>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<AuthUser>, AuthError>;

    /// Case-insensitive match of `login` against the email or the name.
    /// When several users match, the lowest id wins.
    async fn find_user_by_login(&self, login: &str) -> Result<Option<AuthUser>, AuthError>;

    /// Case-insensitive email lookup.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError>;

    /// # Errors
    ///
    /// `AuthError::UserAlreadyExists` when the email is taken.
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
    ) -> Result<AuthUser, AuthError>;

    /// # Errors
    ///
    /// `AuthError::UserNotFound` when no user has `user_id`.
    async fn update_profile(
        &self,
        user_id: i64,
        changes: &ProfileChanges,
    ) -> Result<AuthUser, AuthError>;
}
