use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::crypto::{Argon2Hasher, PasswordHasher};
use crate::events::{self, AuthEvent};
use crate::guard::{AbuseGuard, AdmitDecision, Block};
use crate::jwt::TokenIssuer;
use crate::repository::{AuthUser, RoleRepository, UserRepository};
use crate::secret::SecretString;
use crate::validators::require;
use crate::AuthError;

/// A successful login.
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub user: AuthUser,
    pub roles: Vec<String>,
    pub token: SecretString,
    pub expires_at: DateTime<Utc>,
}

/// Result of a login attempt that got as far as a decision.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Refused by the guard; credentials were not checked.
    Blocked(Block),
    /// No such account, or the password did not match.
    InvalidCredentials {
        /// Short-term attempt count for the IP after this attempt.
        attempts: u64,
    },
    Success(LoginSuccess),
}

/// Guarded login: abuse guard, then credential check, then token issuance.
pub struct LoginAction<U: UserRepository, R: RoleRepository, T: TokenIssuer> {
    guard: AbuseGuard,
    user_repository: U,
    role_repository: R,
    token_issuer: T,
    hasher: Arc<dyn PasswordHasher>,
}

impl<U: UserRepository, R: RoleRepository, T: TokenIssuer> LoginAction<U, R, T> {
    pub fn new(guard: AbuseGuard, user_repository: U, role_repository: R, token_issuer: T) -> Self {
        Self {
            guard,
            user_repository,
            role_repository,
            token_issuer,
            hasher: Arc::new(Argon2Hasher::default()),
        }
    }

    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn guard(&self) -> &AbuseGuard {
        &self.guard
    }

    /// Runs one login attempt from `ip`: [`admit`](Self::admit), then
    /// [`authenticate`](Self::authenticate).
    ///
    /// # Errors
    ///
    /// `AuthError::Validation` for a missing email or password,
    /// `AuthError::StoreUnavailable` when the counter store is down and the
    /// guard is configured to surface it, and repository or signing errors.
    pub async fn execute(
        &self,
        email: &str,
        password: &SecretString,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<LoginOutcome, AuthError> {
        if let Some(block) = self.admit(ip, now).await? {
            return Ok(LoginOutcome::Blocked(block));
        }
        self.authenticate(email, password, ip, now).await
    }

    /// Counts the attempt from `ip` and returns the block refusing it, if any.
    ///
    /// Runs before anything about the request body is known, so malformed
    /// requests use up the IP's budget too.
    ///
    /// # Errors
    ///
    /// `AuthError::StoreUnavailable` under [`StoreFailurePolicy::Unavailable`](crate::StoreFailurePolicy).
    pub async fn admit(&self, ip: &str, now: DateTime<Utc>) -> Result<Option<Block>, AuthError> {
        let AdmitDecision::Blocked(block) = self.guard.admit(ip, now).await? else {
            return Ok(None);
        };

        if !block.newly_triggered {
            log::info!(
                target: "turnstile_auth",
                "msg=\"login refused\", ip=\"{ip}\", kind=\"{:?}\", retry_after={}",
                block.kind,
                block.retry_after
            );
            events::dispatch(AuthEvent::LoginBlocked {
                ip: ip.to_owned(),
                kind: block.kind,
                blocked_until: block.blocked_until,
                at: now,
            })
            .await;
        }
        Ok(Some(block))
    }

    /// Checks credentials for an attempt [`admit`](Self::admit) let through.
    ///
    /// `email` may also hold a user name; matching is case-insensitive.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "login", skip(self, email, password), err)
    )]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &SecretString,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<LoginOutcome, AuthError> {
        require("email", email)?;
        require("password", password.expose_secret())?;

        let account = email.trim().to_lowercase();
        let user = self.user_repository.find_user_by_login(&account).await?;

        let user = match user {
            Some(user) if self.password_matches(password, &user) => user,
            _ => return Ok(self.failed(&account, ip, now).await),
        };

        if let Err(e) = self.guard.on_login_success(ip).await {
            log::error!(
                target: "turnstile_auth",
                "msg=\"failed to reset login guard\", ip=\"{ip}\", error=\"{e}\""
            );
        }

        let issued = self.token_issuer.issue(&user, now)?;
        let roles = self.role_repository.roles_for_user(user.id).await?;

        log::info!(
            target: "turnstile_auth",
            "msg=\"login successful\", user_id={}, ip=\"{ip}\"",
            user.id
        );
        events::dispatch(AuthEvent::LoginSuccess {
            user_id: user.id,
            email: user.email.clone(),
            ip: ip.to_owned(),
            at: now,
        })
        .await;

        Ok(LoginOutcome::Success(LoginSuccess {
            user,
            roles,
            token: issued.token,
            expires_at: issued.expires_at,
        }))
    }

    /// A stored hash that cannot be parsed never matches.
    fn password_matches(&self, password: &SecretString, user: &AuthUser) -> bool {
        match self.hasher.verify(password, &user.hashed_password) {
            Ok(matches) => matches,
            Err(e) => {
                log::error!(
                    target: "turnstile_auth",
                    "msg=\"stored password hash unreadable\", user_id={}, error=\"{e}\"",
                    user.id
                );
                false
            }
        }
    }

    async fn failed(&self, account: &str, ip: &str, now: DateTime<Utc>) -> LoginOutcome {
        let attempts = match self.guard.on_login_failure(ip, account, now).await {
            Ok(attempts) => attempts,
            Err(e) => {
                log::error!(
                    target: "turnstile_auth",
                    "msg=\"failed to read attempt count\", ip=\"{ip}\", error=\"{e}\""
                );
                0
            }
        };

        events::dispatch(AuthEvent::LoginFailed {
            account: account.to_owned(),
            ip: ip.to_owned(),
            attempts,
            at: now,
        })
        .await;

        LoginOutcome::InvalidCredentials { attempts }
    }
}
