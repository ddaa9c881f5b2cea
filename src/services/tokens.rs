//! Issuing and verifying the two JWT kinds.
//!
//! Access and refresh tokens are signed with different secrets and carry a
//! `typ` claim, so neither can stand in for the other.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::TokenConfig;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(rename = "typ")]
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token rejected: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("expected a {expected:?} token")]
    WrongKind { expected: TokenKind },
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub jwt_token: String,
    pub jwt_refresh_token: String,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Keys {
    fn from_secret(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

pub struct TokenService {
    access: Keys,
    refresh: Keys,
    validation: Validation,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            access: Keys::from_secret(&config.access_secret, config.access_ttl),
            refresh: Keys::from_secret(&config.refresh_secret, config.refresh_ttl),
            validation,
        }
    }

    fn keys(&self, kind: TokenKind) -> &Keys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    fn issue(&self, user_id: &str, kind: TokenKind) -> Result<String, AppError> {
        let keys = self.keys(kind);
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            kind,
            iat: now.timestamp(),
            exp: (now + keys.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| AppError::Internal(format!("failed to sign {kind:?} token: {e}")))
    }

    pub fn issue_access_token(&self, user_id: &str) -> Result<String, AppError> {
        self.issue(user_id, TokenKind::Access)
    }

    pub fn issue_refresh_token(&self, user_id: &str) -> Result<String, AppError> {
        self.issue(user_id, TokenKind::Refresh)
    }

    pub fn issue_pair(&self, user_id: &str) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            jwt_token: self.issue_access_token(user_id)?,
            jwt_refresh_token: self.issue_refresh_token(user_id)?,
        })
    }

    /// Checks signature, expiry and kind, using the key that belongs to `kind`.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.keys(kind).decoding, &self.validation)?;
        if data.claims.kind != kind {
            return Err(TokenError::WrongKind { expected: kind });
        }
        Ok(data.claims)
    }

    /// Mints a new access token from a refresh token. The refresh token is not rotated.
    pub fn refresh(&self, refresh_token: &str) -> Result<(Claims, String), AppError> {
        let claims = self.verify(refresh_token, TokenKind::Refresh).map_err(|e| {
            tracing::debug!(error = %e, "Refresh token rejected");
            AppError::MustReauthenticate
        })?;
        let access = self.issue_access_token(&claims.sub)?;
        Ok((claims, access))
    }
}
