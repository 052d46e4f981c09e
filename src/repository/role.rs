use async_trait::async_trait;

use crate::AuthError;

/// Role names assigned to a user.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Role names for `user_id`, empty when the user has none.
    async fn roles_for_user(&self, user_id: i64) -> Result<Vec<String>, AuthError>;
}
