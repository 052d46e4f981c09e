use chrono::Duration;
use std::fmt;

use crate::AuthError;
use crate::config::TokenConfig;

/// Minimum HS256 secret length in bytes.
pub const MIN_SECRET_LENGTH: usize = 32;

#[derive(Clone)]
pub struct JwtConfig {
    pub(crate) secret: String,
    /// Default: 60 minutes
    pub(crate) expiry: Duration,
    pub(crate) issuer: Option<String>,
    pub(crate) audience: Option<String>,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

impl JwtConfig {
    /// # Errors
    ///
    /// `AuthError::ConfigurationError` if `secret` is shorter than
    /// [`MIN_SECRET_LENGTH`] bytes.
    pub fn new(secret: impl Into<String>) -> Result<Self, AuthError> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(AuthError::ConfigurationError(format!(
                "JWT secret must be at least {MIN_SECRET_LENGTH} bytes, got {}",
                secret.len()
            )));
        }

        Ok(Self {
            secret,
            expiry: Duration::minutes(60),
            issuer: None,
            audience: None,
        })
    }

    /// Secret plus expiry and issuer from a [`TokenConfig`].
    pub fn from_token_config(
        secret: impl Into<String>,
        tokens: &TokenConfig,
    ) -> Result<Self, AuthError> {
        let mut config = Self::new(secret)?.with_expiry(tokens.access_token_expiry);
        config.issuer.clone_from(&tokens.issuer);
        Ok(config)
    }

    #[must_use]
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }
}
