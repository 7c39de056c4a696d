use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::UserId;

/// Token payload: the subject and the expiry, nothing else
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: UserId,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing secret is empty")]
    MissingSecret,

    #[error("token generation error: {0}")]
    Signing(String),

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token expired")]
    Expired,

    #[error("token signature mismatch")]
    BadSignature,
}

/// Issues and validates HS256 tokens carrying a single user identifier.
///
/// Holds the signing keys and lifetime; both are fixed at construction and the
/// codec is shared read-only across requests.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: UserId) -> Result<String, TokenError> {
        self.issue_at(user_id, Utc::now())
    }

    pub fn issue_at(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String, TokenError> {
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Signing("token expiry out of range".to_string()))?;
        let claims = Claims {
            user_id,
            exp: expires.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn validate(&self, token: &str) -> Result<UserId, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// Verifies the signature and checks expiry against `now`.
    ///
    /// A token is usable strictly before its `exp` second.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against the caller's clock
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed(e.to_string()),
        })?;

        if data.claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims.user_id)
    }
}
