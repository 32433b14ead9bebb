//! Error taxonomy of the authentication/session subsystem.
//!
//! Every variant terminates the auth decision for the request it occurs in.
//! Client-facing messages are short and uniform; the underlying causes of
//! server-side failures are only ever written to the log.

use actix_web::http::StatusCode;
use thiserror::Error;

/// Failure of a key-value backend call.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend returned an error (connection refused, protocol error, ...).
    #[error("backend error: {0}")]
    Backend(String),
    /// The call did not complete before the configured deadline.
    #[error("operation timed out after {0} ms")]
    Timeout(u128),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown username or wrong password. The two causes are never told apart.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("missing token")]
    MissingToken,

    /// Malformed token, wrong algorithm, bad signature or claim mismatch.
    #[error("invalid token")]
    InvalidToken,

    /// Signature is fine but the token is past its expiration.
    #[error("token expired")]
    TokenExpired,

    /// Signature and expiration are fine but the live record is gone.
    #[error("token revoked")]
    TokenRevoked,

    #[error("token store unavailable")]
    StoreUnavailable(#[source] StoreError),

    #[error("failed to sign token")]
    Signing(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::StoreUnavailable(_) | AuthError::Signing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        log::error!("token store call failed: {}", err);
        AuthError::StoreUnavailable(err)
    }
}
