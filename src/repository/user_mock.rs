#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};

use crate::AuthError;

use super::user::{AuthUser, ProfileChanges, UserRepository};

#[derive(Clone, Default)]
pub struct MockUserRepository {
    pub users: Arc<Mutex<Vec<AuthUser>>>,
}

impl MockUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<AuthUser>) -> Self {
        Self {
            users: Arc::new(Mutex::new(users)),
        }
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<AuthUser>, AuthError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<AuthUser>, AuthError> {
        let login = login.to_lowercase();
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .filter(|u| u.email.to_lowercase() == login || u.name.to_lowercase() == login)
            .min_by_key(|u| u.id)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
        let email = email.to_lowercase();
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }

    async fn create_user(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
    ) -> Result<AuthUser, AuthError> {
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(email))
        {
            return Err(AuthError::UserAlreadyExists);
        }

        let id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        let user = AuthUser::mock_from_credentials(email, hashed_password)
            .with_id(id)
            .with_name(name);
        users.push(user.clone());
        drop(users);

        Ok(user)
    }

    async fn update_profile(
        &self,
        user_id: i64,
        changes: &ProfileChanges,
    ) -> Result<AuthUser, AuthError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(AuthError::UserNotFound)?;

        if let Some(name) = &changes.name {
            name.clone_into(&mut user.name);
        }
        if let Some(hash) = &changes.hashed_password {
            hash.clone_into(&mut user.hashed_password);
        }
        user.updated_at = Utc::now();

        Ok(user.clone())
    }
}
