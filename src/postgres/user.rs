use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::db_error;
use crate::repository::{AuthUser, ProfileChanges, UserRepository};
use crate::AuthError;

const USER_COLUMNS: &str = "id, name, email, hashed_password, role_id, created_at, updated_at";

#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    name: String,
    email: String,
    hashed_password: String,
    role_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRecord> for AuthUser {
    fn from(row: UserRecord) -> Self {
        AuthUser {
            id: row.id,
            name: row.name,
            email: row.email,
            hashed_password: row.hashed_password,
            role_id: row.role_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|d| d.code())
        .is_some_and(|code| code == "23505")
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_user_by_id(&self, id: i64) -> Result<Option<AuthUser>, AuthError> {
        let row: Option<UserRecord> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("find_user_by_id", &e))?;

        Ok(row.map(Into::into))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_user_by_login(&self, login: &str) -> Result<Option<AuthUser>, AuthError> {
        let row: Option<UserRecord> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE LOWER(email) = LOWER($1) OR LOWER(name) = LOWER($1) \
             ORDER BY id LIMIT 1"
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find_user_by_login", &e))?;

        Ok(row.map(Into::into))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
        let row: Option<UserRecord> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find_user_by_email", &e))?;

        Ok(row.map(Into::into))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, hashed_password), err))]
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
    ) -> Result<AuthUser, AuthError> {
        let row: UserRecord = sqlx::query_as(&format!(
            "INSERT INTO users (name, email, hashed_password) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AuthError::UserAlreadyExists
            } else {
                db_error("create_user", &e)
            }
        })?;

        Ok(row.into())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, changes), err))]
    async fn update_profile(
        &self,
        user_id: i64,
        changes: &ProfileChanges,
    ) -> Result<AuthUser, AuthError> {
        let row: Option<UserRecord> = sqlx::query_as(&format!(
            "UPDATE users SET \
                 name = COALESCE($1, name), \
                 hashed_password = COALESCE($2, hashed_password), \
                 updated_at = NOW() \
             WHERE id = $3 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(changes.name.as_deref())
        .bind(changes.hashed_password.as_deref())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("update_profile", &e))?;

        row.map(Into::into).ok_or(AuthError::UserNotFound)
    }
}
