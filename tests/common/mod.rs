#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::header;
use actix_web::middleware::Logger;
use actix_web::{test, web, App, Error};
use serde_json::{json, Value};

use taskkeeper::auth::{AuthService, MemoryStore, TokenIssuer, TokenStore};
use taskkeeper::config::AuthConfig;
use taskkeeper::models::NewUser;
use taskkeeper::repository::{
    MemoryTaskRepository, MemoryUserRepository, TaskRepository, UserRepository,
};
use taskkeeper::routes::{self, health};

pub const SECRET: &str = "integration-test-secret-with-32-or-more-bytes";

/// Everything an in-process app needs, with Redis and PostgreSQL replaced by
/// in-memory stand-ins. `alice` (id 1) and `bob` (id 2) exist, both with the
/// password `correct`.
pub struct TestContext {
    pub config: AuthConfig,
    pub users: Arc<dyn UserRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub store: TokenStore,
    pub auth: web::Data<AuthService>,
}

impl TestContext {
    pub async fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut config = AuthConfig::with_secret(SECRET);
        config.secure_cookies = false;

        let users: Arc<dyn UserRepository> = Arc::new(MemoryUserRepository::new());
        for name in ["alice", "bob"] {
            users
                .create(NewUser {
                    username: name.to_string(),
                    email: format!("{}@example.com", name),
                    password_hash: bcrypt::hash("correct", 4).unwrap(),
                })
                .await
                .unwrap();
        }

        let tasks: Arc<dyn TaskRepository> = Arc::new(MemoryTaskRepository::new());
        let store = TokenStore::new(Arc::new(MemoryStore::new()), Duration::from_millis(200));
        let auth = web::Data::new(AuthService::new(users.clone(), store.clone(), &config));

        Self {
            config,
            users,
            tasks,
            store,
            auth,
        }
    }

    /// An issuer sharing the app's secret, for minting tokens the app never
    /// persisted.
    pub fn issuer(&self) -> TokenIssuer {
        TokenIssuer::new(&self.config)
    }

    pub async fn app(
        &self,
    ) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error> {
        test::init_service(
            App::new()
                .app_data(self.auth.clone())
                .app_data(web::Data::from(self.users.clone()))
                .app_data(web::Data::from(self.tasks.clone()))
                .wrap(
                    Cors::default()
                        .allow_any_origin()
                        .allow_any_method()
                        .allow_any_header()
                        .max_age(3600),
                )
                .wrap(Logger::default())
                .service(health::health)
                .service(web::scope("/api").configure(routes::config)),
        )
        .await
    }
}

/// Logs in through the API and returns the JSON body.
pub async fn login<S, B>(app: &S, username: &str, password: &str) -> Value
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": username, "password": password }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK, "login failed");
    test::read_body_json(resp).await
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}
