use crate::{
    auth::{
        extractors::{token_from_request, ACCESS_COOKIE, REFRESH_COOKIE},
        password::hash_password_blocking,
        AuthError, AuthMiddleware, AuthService, LoginRequest, RefreshRequest, RegisterRequest,
        RegisterResponse, TokenKind, TokenPair, TokenResponse,
    },
    error::AppError,
    models::NewUser,
    repository::UserRepository,
};
use actix_web::{
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    post, web, HttpRequest, HttpResponse, Responder,
};
use chrono::Utc;
use validator::Validate;

fn session_cookie(name: &'static str, value: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(max_age_secs.max(0)))
        .finish()
}

/// `200 OK` with the token triple in the body and both tokens as cookies.
fn token_response(pair: &TokenPair, secure: bool) -> HttpResponse {
    let now = Utc::now();
    let lifetime = |kind: TokenKind| (pair.expires_at(kind) - now).num_seconds();

    HttpResponse::Ok()
        .cookie(session_cookie(
            ACCESS_COOKIE,
            pair.access.clone(),
            lifetime(TokenKind::Access),
            secure,
        ))
        .cookie(session_cookie(
            REFRESH_COOKIE,
            pair.refresh.clone(),
            lifetime(TokenKind::Refresh),
            secure,
        ))
        .json(TokenResponse::from(pair))
}

/// Register a new user
///
/// Creates the account and returns its ID. Does not log the user in.
#[post("/register")]
pub async fn register(
    users: web::Data<dyn UserRepository>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;
    let RegisterRequest {
        username,
        email,
        password,
    } = register_data.into_inner();

    let password_hash = hash_password_blocking(password).await?;
    let id = users
        .create(NewUser {
            username,
            email,
            password_hash,
        })
        .await?;

    log::info!("registered user {}", id);
    Ok(HttpResponse::Created().json(RegisterResponse { id }))
}

/// Login user
///
/// Checks the credentials and issues a new access/refresh pair.
#[post("/login")]
pub async fn login(
    auth: web::Data<AuthService>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let pair = auth
        .login(&login_data.username, &login_data.password)
        .await?;
    Ok(token_response(&pair, auth.secure_cookies()))
}

/// Exchange a refresh token for a brand-new pair
///
/// The token comes from the JSON body or, when the body is absent or its
/// token is empty, the `refresh_token` cookie. The presented refresh token
/// stops working.
#[post("/refresh")]
pub async fn refresh(
    auth: web::Data<AuthService>,
    body: Option<web::Json<RefreshRequest>>,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let from_cookie = || {
        req.cookie(REFRESH_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|token| !token.is_empty())
    };
    let token = body
        .map(|json| json.into_inner().refresh_token)
        .filter(|token| !token.is_empty())
        .or_else(from_cookie)
        .ok_or(AuthError::MissingToken)?;

    let pair = auth.refresh(&token).await?;
    Ok(token_response(&pair, auth.secure_cookies()))
}

/// Logout
///
/// Revokes the presented access token and clears the auth cookies.
#[post("/logout", wrap = "AuthMiddleware")]
pub async fn logout(
    auth: web::Data<AuthService>,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let token = token_from_request(&req).ok_or(AuthError::MissingToken)?;
    auth.logout(&token).await?;

    let secure = auth.secure_cookies();
    Ok(HttpResponse::NoContent()
        .cookie(session_cookie(ACCESS_COOKIE, String::new(), 0, secure))
        .cookie(session_cookie(REFRESH_COOKIE, String::new(), 0, secure))
        .finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::auth::TokenIssuer;

    #[test]
    fn test_token_response_sets_cookies() {
        let issuer = TokenIssuer::new(&AuthConfig::with_secret(
            "cookie-test-secret-with-32-or-more-bytes!",
        ));
        let pair = issuer.issue_pair("1").unwrap();

        let resp = token_response(&pair, true);
        let cookies: Vec<_> = resp.cookies().collect();
        assert_eq!(cookies.len(), 2);

        let access = cookies.iter().find(|c| c.name() == ACCESS_COOKIE).unwrap();
        assert_eq!(access.value(), pair.access);
        assert_eq!(access.http_only(), Some(true));
        assert_eq!(access.secure(), Some(true));
        assert_eq!(access.same_site(), Some(SameSite::Lax));
        let max_age = access.max_age().unwrap().whole_seconds();
        assert!((895..=900).contains(&max_age), "max-age was {}", max_age);

        let refresh_cookie = cookies.iter().find(|c| c.name() == REFRESH_COOKIE).unwrap();
        assert_eq!(refresh_cookie.value(), pair.refresh);
        assert!(refresh_cookie.max_age().unwrap().whole_seconds() > 7 * 24 * 3600 - 10);
    }

    #[test]
    fn test_cleared_cookie_expires_immediately() {
        let cookie = session_cookie(ACCESS_COOKIE, String::new(), 0, false);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(CookieDuration::ZERO));
        assert_eq!(cookie.secure(), Some(false));
    }
}
