use std::io;
use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;

use taskkeeper::auth::{AuthService, RedisStore, TokenStore};
use taskkeeper::config::Config;
use taskkeeper::repository::{PgTaskRepository, PgUserRepository, TaskRepository, UserRepository};
use taskkeeper::routes::{self, health};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e))?;
    sqlx::migrate!()
        .run(&pool)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    let redis = RedisStore::connect(&config.redis_url)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e))?;
    let store = TokenStore::new(Arc::new(redis), config.auth.store_timeout);

    let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool.clone()));
    let tasks: Arc<dyn TaskRepository> = Arc::new(PgTaskRepository::new(pool));
    let auth = web::Data::new(AuthService::new(users.clone(), store, &config.auth));
    let users = web::Data::from(users);
    let tasks = web::Data::from(tasks);

    let cors_origins = config.cors_origins.clone();
    log::info!("Starting taskkeeper server at {}", config.server_url());

    HttpServer::new(move || {
        App::new()
            .app_data(auth.clone())
            .app_data(users.clone())
            .app_data(tasks.clone())
            .wrap(routes::cors(&cors_origins))
            .wrap(Logger::default())
            .service(health::health)
            .service(web::scope("/api").configure(routes::config))
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
