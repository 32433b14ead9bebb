use crate::{
    auth::AuthenticatedUserId, error::AppError, models::UserProfile, repository::UserRepository,
};
use actix_web::{get, web, HttpResponse, Responder};

/// Profile of the authenticated user.
///
/// ## Responses:
/// - `200 OK`: `{id, username, email, created_at}`.
/// - `401 Unauthorized`: If the request lacks a live access token.
/// - `404 Not Found`: If the user was deleted after the token was issued.
#[get("/profile")]
pub async fn profile(
    users: web::Data<dyn UserRepository>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let user = users
        .get_by_id(user_id.0)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(HttpResponse::Ok().json(UserProfile::from(user)))
}
