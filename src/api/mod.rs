//! HTTP-facing types and, with `axum_support`, the axum router.

mod types;

pub use types::*;

#[cfg(feature = "axum_support")]
pub mod axum;
