use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::crypto::{Argon2Hasher, PasswordHasher};
use crate::events::{self, AuthEvent};
use crate::repository::{AuthUser, ProfileChanges, UserRepository};
use crate::secret::SecretString;
use crate::validators::{PasswordPolicy, validate_name};
use crate::AuthError;

/// Partial profile update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileInput {
    pub name: Option<String>,
    pub password: Option<SecretString>,
}

pub struct UpdateProfileAction<U: UserRepository> {
    user_repository: U,
    hasher: Arc<dyn PasswordHasher>,
    policy: PasswordPolicy,
}

impl<U: UserRepository> UpdateProfileAction<U> {
    pub fn new(user_repository: U) -> Self {
        Self {
            user_repository,
            hasher: Arc::new(Argon2Hasher::default()),
            policy: PasswordPolicy::min_length(6),
        }
    }

    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "update_profile", skip(self, input), err)
    )]
    pub async fn execute(
        &self,
        user_id: i64,
        input: &UpdateProfileInput,
        now: DateTime<Utc>,
    ) -> Result<AuthUser, AuthError> {
        let mut changes = ProfileChanges::default();

        if let Some(name) = &input.name {
            validate_name(name.trim())?;
            changes.name = Some(name.trim().to_owned());
        }
        if let Some(password) = &input.password {
            self.policy.validate(password.expose_secret())?;
            changes.hashed_password = Some(self.hasher.hash(password)?);
        }

        let user = self.user_repository.update_profile(user_id, &changes).await?;

        events::dispatch(AuthEvent::ProfileUpdated { user_id, at: now }).await;
        Ok(user)
    }
}
