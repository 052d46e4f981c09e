//! Storage abstractions for users and roles.
//!
//! | Trait | Description |
//! |-------|-------------|
//! | [`UserRepository`] | User lookup (including case-insensitive login), creation, profile updates |
//! | [`RoleRepository`] | Role names per user |
//!
//! Enable the `mocks` feature for in-memory implementations
//! ([`MockUserRepository`], [`MockRoleRepository`]). Postgres implementations
//! live in [`crate::postgres`] behind `sqlx_postgres`.

mod role;
mod user;

#[cfg(any(test, feature = "mocks"))]
mod role_mock;
#[cfg(any(test, feature = "mocks"))]
mod user_mock;

pub use role::RoleRepository;
pub use user::{AuthUser, ProfileChanges, UserRepository};

#[cfg(any(test, feature = "mocks"))]
pub use role_mock::MockRoleRepository;
#[cfg(any(test, feature = "mocks"))]
pub use user_mock::MockUserRepository;
