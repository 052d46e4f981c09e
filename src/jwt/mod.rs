//! HS256 access tokens.
//!
//! ```rust
//! use turnstile::jwt::{JwtConfig, JwtService};
//! # fn main() -> Result<(), turnstile::AuthError> {
//! let config = JwtConfig::new("an-hs256-secret-of-at-least-32-bytes")?
//!     .with_issuer("turnstile");
//! let service = JwtService::new(config);
//!
//! let (token, _expires_at) = service.encode(42, chrono::Utc::now())?;
//! assert_eq!(service.validate(&token)?, 42);
//! # Ok(())
//! # }
//! ```

mod claims;
mod config;
mod issuer;
mod service;

pub use claims::JwtClaims;
pub use config::{JwtConfig, MIN_SECRET_LENGTH};
pub use issuer::{IssuedToken, TokenIssuer};
pub use service::JwtService;
