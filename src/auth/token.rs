use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::error::AuthError;
use crate::config::AuthConfig;

/// The only algorithm tokens are signed with, and the only one accepted.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Registered claims carried by both access and refresh tokens.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject of the token: the user's ID, as a string.
    pub sub: String,
    /// Unique token identifier, also the key of the live record in the token store.
    pub jti: String,
    pub iss: String,
    pub aud: String,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
    /// Expiration, seconds since epoch.
    pub exp: i64,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// Which half of a pair a token is. Selects the key namespace in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn prefix(self) -> &'static str {
        match self {
            TokenKind::Access => "access:",
            TokenKind::Refresh => "refresh:",
        }
    }

    /// Store key of the live record for the token with identifier `jti`.
    pub fn key(self, jti: &str) -> String {
        format!("{}{}", self.prefix(), jti)
    }
}

/// Result of one issuance. Never mutated; a refresh produces a new pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub subject: String,
    pub access: String,
    pub access_jti: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh: String,
    pub refresh_jti: String,
    pub refresh_expires_at: DateTime<Utc>,
}

impl TokenPair {
    pub fn jti(&self, kind: TokenKind) -> &str {
        match kind {
            TokenKind::Access => &self.access_jti,
            TokenKind::Refresh => &self.refresh_jti,
        }
    }

    pub fn expires_at(&self, kind: TokenKind) -> DateTime<Utc> {
        match kind {
            TokenKind::Access => self.access_expires_at,
            TokenKind::Refresh => self.refresh_expires_at,
        }
    }
}

/// Mints signed access/refresh pairs. Persisting them is a separate step.
pub struct TokenIssuer {
    key: EncodingKey,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_ttl: Duration::seconds(config.access_ttl_secs),
            refresh_ttl: Duration::seconds(config.refresh_ttl_secs),
        }
    }

    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, AuthError> {
        self.issue_pair_at(subject, Utc::now())
    }

    /// Issues a pair as if the current time were `now`.
    pub fn issue_pair_at(&self, subject: &str, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        let access = self.claims(subject, now, self.access_ttl);
        let refresh = self.claims(subject, now, self.refresh_ttl);

        Ok(TokenPair {
            subject: subject.to_string(),
            access: self.sign(&access)?,
            access_expires_at: access.expires_at(),
            access_jti: access.jti,
            refresh: self.sign(&refresh)?,
            refresh_expires_at: refresh.expires_at(),
            refresh_jti: refresh.jti,
        })
    }

    fn claims(&self, subject: &str, now: DateTime<Utc>, ttl: Duration) -> Claims {
        Claims {
            sub: subject.to_string(),
            jti: Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(SIGNING_ALGORITHM), claims, &self.key).map_err(|e| {
            log::error!("failed to sign token {}: {}", claims.jti, e);
            AuthError::Signing(e.to_string())
        })
    }
}

/// Checks signature, algorithm, issuer, audience and expiration of a token.
///
/// Liveness is deliberately not checked here: callers consult the
/// [`TokenStore`](crate::auth::store::TokenStore) afterwards, so a forged
/// token and an unreachable store surface as different errors.
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = 0;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        Self {
            key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                kind => {
                    log::debug!("rejected token: {:?}", kind);
                    AuthError::InvalidToken
                }
            })
    }
}
