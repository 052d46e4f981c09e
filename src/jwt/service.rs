use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::{IssuedToken, JwtClaims, JwtConfig, TokenIssuer};
use crate::AuthError;
use crate::crypto::random_id;
use crate::repository::AuthUser;
use crate::secret::SecretString;

const JTI_LENGTH: usize = 16;

#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Signs an access token for `user_id` issued at `now`.
    pub fn encode(&self, user_id: i64, now: DateTime<Utc>) -> Result<(String, DateTime<Utc>), AuthError> {
        let expires_at = now + self.config.expiry;

        let claims = JwtClaims {
            sub: user_id.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: random_id(JTI_LENGTH),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("failed to sign token: {e}")))?;

        Ok((token, expires_at))
    }

    /// Checks signature, expiry, issuer and audience.
    pub fn decode(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);

        if let Some(ref iss) = self.config.issuer {
            validation.set_issuer(&[iss]);
        }

        if let Some(ref aud) = self.config.audience {
            validation.set_audience(&[aud]);
        }

        let token_data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            })?;

        Ok(token_data.claims)
    }

    pub fn validate(&self, token: &str) -> Result<i64, AuthError> {
        self.decode(token)?.user_id()
    }

    pub fn expiry(&self) -> Duration {
        self.config.expiry
    }
}

impl TokenIssuer for JwtService {
    fn issue(&self, user: &AuthUser, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let (token, expires_at) = self.encode(user.id, now)?;

        Ok(IssuedToken {
            token: SecretString::new(token),
            expires_at,
        })
    }

    fn verify(&self, token: &str) -> Result<i64, AuthError> {
        self.validate(token)
    }
}
