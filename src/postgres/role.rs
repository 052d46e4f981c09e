use async_trait::async_trait;
use sqlx::PgPool;

use super::db_error;
use crate::repository::RoleRepository;
use crate::AuthError;

#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Grants `role` to `user_id`, creating the role if needed.
    pub async fn assign_role(&self, user_id: i64, role: &str) -> Result<(), AuthError> {
        sqlx::query(
            r"
            WITH role AS (
                INSERT INTO roles (name) VALUES ($2)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id
            )
            INSERT INTO user_roles (user_id, role_id)
            SELECT $1, id FROM role
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(role)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("assign_role", &e))?;

        Ok(())
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn roles_for_user(&self, user_id: i64) -> Result<Vec<String>, AuthError> {
        sqlx::query_scalar(
            r"
            SELECT r.name
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.name
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("roles_for_user", &e))
    }
}
