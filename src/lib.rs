#![doc = "The `taskkeeper` library crate."]
#![doc = ""]
#![doc = "Domain models, storage, JWT session control and routing for the task"]
#![doc = "management API. The binary (`main.rs`) wires these into an `HttpServer`;"]
#![doc = "the integration tests wire them into `actix_web::test` services."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod routes;

pub use crate::config::Config;
pub use crate::error::AppError;
