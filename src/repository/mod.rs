//! Storage capabilities the handlers and the auth service depend on.
//!
//! The relational store sits behind these traits so it can be swapped for
//! the in-memory implementations in tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{NewUser, Task, TaskChanges, TaskQuery, User};

pub use memory::{MemoryTaskRepository, MemoryUserRepository};
pub use postgres::{PgTaskRepository, PgUserRepository};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a user and returns its ID.
    async fn create(&self, user: NewUser) -> Result<i32, AppError>;

    async fn get_by_id(&self, id: i32) -> Result<Option<User>, AppError>;

    /// The credential source for login.
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, changes: TaskChanges) -> Result<Task, AppError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Task>, AppError>;

    /// Tasks created by `owner`, newest first, filtered by `query`.
    async fn list(&self, owner: i32, query: &TaskQuery) -> Result<Vec<Task>, AppError>;

    /// Replaces the mutable columns of task `id`. `None` if it does not exist.
    async fn update_by_id(&self, id: i64, changes: TaskChanges) -> Result<Option<Task>, AppError>;

    /// Returns whether a row was deleted.
    async fn delete_by_id(&self, id: i64) -> Result<bool, AppError>;
}
