//! Password hashing and random identifiers.

use argon2::{Algorithm, Argon2, Params, PasswordVerifier, Version};
use password_hash::{PasswordHash, PasswordHasher as ArgonPasswordHasher, SaltString};
use rand::Rng;
use rand::rngs::OsRng;

use crate::AuthError;
use crate::secret::SecretString;

/// Pluggable password hashing, used by registration, profile updates and login.
///
/// ```rust
/// use turnstile::crypto::{Argon2Hasher, PasswordHasher};
/// use turnstile::SecretString;
///
/// let hasher = Argon2Hasher::default();
/// let hash = hasher.hash(&SecretString::new("Passw0rd!")).unwrap();
/// assert!(hasher.verify(&SecretString::new("Passw0rd!"), &hash).unwrap());
/// assert!(!hasher.verify(&SecretString::new("passw0rd!"), &hash).unwrap());
/// ```
pub trait PasswordHasher: Send + Sync {
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHashError` if hashing fails.
    fn hash(&self, password: &SecretString) -> Result<String, AuthError>;

    /// Returns `Ok(false)` on mismatch.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHashError` if the stored hash is malformed.
    fn verify(&self, password: &SecretString, hash: &str) -> Result<bool, AuthError>;
}

/// Argon2id hasher.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    /// KiB
    memory_cost: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            memory_cost: 19456,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl Argon2Hasher {
    #[must_use]
    pub fn new(memory_cost: u32, time_cost: u32, parallelism: u32) -> Self {
        Self {
            memory_cost,
            time_cost,
            parallelism,
        }
    }

    /// 64 MiB, 3 iterations, 4 lanes.
    #[must_use]
    pub fn production() -> Self {
        Self::new(65536, 3, 4)
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &SecretString) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let params = Params::new(self.memory_cost, self.time_cost, self.parallelism, None)
            .map_err(|_| AuthError::PasswordHashError)?;

        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(password.expose_secret().as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|_| AuthError::PasswordHashError)
    }

    fn verify(&self, password: &SecretString, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|_| AuthError::PasswordHashError)?;

        // params are read from the PHC string
        Ok(Argon2::default()
            .verify_password(password.expose_secret().as_bytes(), &parsed)
            .is_ok())
    }
}

/// Random alphanumeric string, used for JWT ids.
pub fn random_id(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(rand::distributions::Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
