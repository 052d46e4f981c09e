//! `PostgreSQL` implementations of the repositories.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE roles (
//!     id BIGSERIAL PRIMARY KEY,
//!     name VARCHAR(255) NOT NULL UNIQUE
//! );
//!
//! CREATE TABLE users (
//!     id BIGSERIAL PRIMARY KEY,
//!     name VARCHAR(255) NOT NULL,
//!     email VARCHAR(255) NOT NULL,
//!     hashed_password VARCHAR(255) NOT NULL,
//!     role_id BIGINT REFERENCES roles(id),
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//!
//! CREATE UNIQUE INDEX idx_users_email_lower ON users (LOWER(email));
//! CREATE INDEX idx_users_name_lower ON users (LOWER(name));
//!
//! CREATE TABLE user_roles (
//!     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     role_id BIGINT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
//!     PRIMARY KEY (user_id, role_id)
//! );
//! ```
//!
//! The counter store table is documented on
//! [`PostgresCounterStore`](crate::store::PostgresCounterStore).

mod role;
mod user;

pub use role::PostgresRoleRepository;
pub use user::PostgresUserRepository;

use sqlx::PgPool;

use crate::store::PostgresCounterStore;

/// Creates the user and role repositories and the counter store from one pool.
pub fn create_repositories(
    pool: PgPool,
) -> (
    PostgresUserRepository,
    PostgresRoleRepository,
    PostgresCounterStore,
) {
    (
        PostgresUserRepository::new(pool.clone()),
        PostgresRoleRepository::new(pool.clone()),
        PostgresCounterStore::new(pool),
    )
}

pub(crate) fn db_error(operation: &str, e: &sqlx::Error) -> crate::AuthError {
    log::error!(target: "turnstile_auth", "msg=\"database error\", operation=\"{operation}\", error=\"{e}\"");
    crate::AuthError::DatabaseError(e.to_string())
}
