#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::AuthError;

use super::role::RoleRepository;

#[derive(Clone, Default)]
pub struct MockRoleRepository {
    pub roles: Arc<Mutex<HashMap<i64, Vec<String>>>>,
}

impl MockRoleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&self, user_id: i64, role: &str) {
        self.roles
            .lock()
            .unwrap()
            .entry(user_id)
            .or_default()
            .push(role.to_owned());
    }
}

#[async_trait]
impl RoleRepository for MockRoleRepository {
    async fn roles_for_user(&self, user_id: i64) -> Result<Vec<String>, AuthError> {
        let roles = self.roles.lock().unwrap();
        Ok(roles.get(&user_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roles_for_user() {
        let repo = MockRoleRepository::new();
        repo.assign(1, "admin");
        repo.assign(1, "editor");

        assert_eq!(repo.roles_for_user(1).await.unwrap(), vec!["admin", "editor"]);
        assert!(repo.roles_for_user(2).await.unwrap().is_empty());
    }
}
