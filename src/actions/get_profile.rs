use crate::repository::{AuthUser, UserRepository};
use crate::AuthError;

/// Profile reads for an authenticated caller.
pub struct GetProfileAction<U: UserRepository> {
    user_repository: U,
}

impl<U: UserRepository> GetProfileAction<U> {
    pub fn new(user_repository: U) -> Self {
        Self { user_repository }
    }

    /// The caller's own profile, or `target_id`'s if it is the caller.
    ///
    /// # Errors
    ///
    /// `AuthError::Forbidden` when `target_id` names someone else.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "get_own_profile", skip(self), err)
    )]
    pub async fn own(&self, caller_id: i64, target_id: Option<i64>) -> Result<AuthUser, AuthError> {
        if target_id.is_some_and(|id| id != caller_id) {
            log::warn!(
                target: "turnstile_auth",
                "msg=\"profile access denied\", caller_id={caller_id}, target_id={}",
                target_id.unwrap_or_default()
            );
            return Err(AuthError::Forbidden);
        }

        self.find(caller_id).await
    }

    /// Any user's profile.
    ///
    /// # Errors
    ///
    /// `AuthError::UserNotFound` when `user_id` does not exist.
    pub async fn find(&self, user_id: i64) -> Result<AuthUser, AuthError> {
        self.user_repository
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}
