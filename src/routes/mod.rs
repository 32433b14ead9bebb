pub mod auth;
pub mod health;
pub mod tasks;
pub mod user;

use actix_cors::Cors;
use actix_web::{http::header, web};

use crate::auth::AuthMiddleware;

/// CORS policy for `CORS_ORIGINS`. An empty list allows any origin.
///
/// Credentials are allowed so browsers send the auth cookies; with any origin
/// allowed, the request's own origin is echoed back.
pub fn cors(origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allow_any_method()
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .supports_credentials()
        .max_age(3600);
    if origins.is_empty() {
        return cors.allow_any_origin();
    }
    origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

/// Mounts the API under whatever scope the caller provides (`/api` in the
/// binary). Everything except register, login and refresh is behind
/// [`AuthMiddleware`].
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(auth::register)
            .service(auth::login)
            .service(auth::refresh)
            .service(auth::logout),
    )
    .service(
        web::scope("/user")
            .wrap(AuthMiddleware)
            .service(user::profile),
    )
    .service(
        web::scope("/tasks")
            .wrap(AuthMiddleware)
            .service(tasks::get_tasks)
            .service(tasks::create_task)
            .service(tasks::get_task)
            .service(tasks::update_task)
            .service(tasks::archive_task)
            .service(tasks::delete_task),
    );
}
