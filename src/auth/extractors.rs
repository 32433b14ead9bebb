use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::error::AppError;

/// Cookie consulted first for the access token.
pub const ACCESS_COOKIE: &str = "access_token";
/// Cookie the refresh endpoint falls back to.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Picks the presented token: the access cookie if it holds a value,
/// otherwise the credentials of an `Authorization: Bearer` header.
pub fn extract_token(cookie: Option<&str>, authorization: Option<&str>) -> Option<String> {
    let from_cookie = cookie.map(str::trim).filter(|value| !value.is_empty());
    let from_header = || {
        authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };
    from_cookie.or_else(from_header).map(String::from)
}

/// [`extract_token`] applied to a request.
pub fn token_from_request(req: &HttpRequest) -> Option<String> {
    let cookie = req.cookie(ACCESS_COOKIE);
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    extract_token(cookie.as_ref().map(|c| c.value()), authorization)
}

/// The authenticated user's ID, inserted into request extensions by
/// `AuthMiddleware`.
///
/// Extracting it on a route the middleware does not cover fails with
/// `AppError::Unauthorized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUserId(pub i32);

impl FromRequest for AuthenticatedUserId {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUserId>().copied() {
            Some(user_id) => ready(Ok(user_id)),
            None => {
                let err = AppError::Unauthorized(
                    "User ID not found in request. Ensure AuthMiddleware is active.".to_string(),
                );
                ready(Err(err.into()))
            }
        }
    }
}
