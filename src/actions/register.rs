use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::crypto::{Argon2Hasher, PasswordHasher};
use crate::events::{self, AuthEvent};
use crate::repository::{AuthUser, UserRepository};
use crate::secret::SecretString;
use crate::validators::{
    PasswordPolicy, validate_email, validate_name, validate_password_confirmation,
};
use crate::AuthError;

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub password_confirmation: SecretString,
}

pub struct RegisterAction<U: UserRepository> {
    user_repository: U,
    hasher: Arc<dyn PasswordHasher>,
    policy: PasswordPolicy,
}

impl<U: UserRepository> RegisterAction<U> {
    pub fn new(user_repository: U) -> Self {
        Self {
            user_repository,
            hasher: Arc::new(Argon2Hasher::default()),
            policy: PasswordPolicy::registration(),
        }
    }

    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "register", skip_all, err)
    )]
    pub async fn execute(
        &self,
        input: &RegisterInput,
        now: DateTime<Utc>,
    ) -> Result<AuthUser, AuthError> {
        let name = input.name.trim();
        let email = input.email.trim();

        validate_name(name)?;
        validate_email(email)?;
        self.policy.validate(input.password.expose_secret())?;
        validate_password_confirmation(
            input.password.expose_secret(),
            input.password_confirmation.expose_secret(),
        )?;

        if self.user_repository.find_user_by_email(email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let hashed = self.hasher.hash(&input.password)?;
        let user = self.user_repository.create_user(name, email, &hashed).await?;

        log::info!(target: "turnstile_auth", "msg=\"user registered\", user_id={}", user.id);
        events::dispatch(AuthEvent::UserRegistered {
            user_id: user.id,
            email: user.email.clone(),
            at: now,
        })
        .await;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockUserRepository;

    fn input(email: &str, password: &str, confirmation: &str) -> RegisterInput {
        RegisterInput {
            name: "New User".to_owned(),
            email: email.to_owned(),
            password: password.into(),
            password_confirmation: confirmation.into(),
        }
    }

    fn action(repo: MockUserRepository) -> RegisterAction<MockUserRepository> {
        RegisterAction::new(repo).with_hasher(Arc::new(Argon2Hasher::new(1024, 1, 1)))
    }

    #[tokio::test]
    async fn test_register_success() {
        let repo = MockUserRepository::new();
        let action = action(repo.clone());

        let user = action
            .execute(&input("new@example.com", "Passw0rd!", "Passw0rd!"), Utc::now())
            .await
            .unwrap();

        assert_eq!(user.email, "new@example.com");
        assert!(user.hashed_password.starts_with("$argon2id$"));
        assert_eq!(repo.users.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_rejects_weak_password() {
        let action = action(MockUserRepository::new());

        let result = action
            .execute(&input("new@example.com", "password", "password"), Utc::now())
            .await;
        assert!(matches!(result, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_mismatched_confirmation() {
        let action = action(MockUserRepository::new());

        let result = action
            .execute(&input("new@example.com", "Passw0rd!", "Passw0rd?"), Utc::now())
            .await;
        assert_eq!(
            result.unwrap_err(),
            AuthError::Validation("The password field confirmation does not match.".to_owned())
        );
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let repo = MockUserRepository::with_users(vec![AuthUser::mock_from_credentials(
            "taken@example.com",
            "h",
        )]);
        let action = action(repo);

        let result = action
            .execute(&input("TAKEN@example.com", "Passw0rd!", "Passw0rd!"), Utc::now())
            .await;
        assert_eq!(result.unwrap_err(), AuthError::UserAlreadyExists);
    }
}
