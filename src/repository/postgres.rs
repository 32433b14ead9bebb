use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{TaskRepository, UserRepository};
use crate::error::AppError;
use crate::models::{NewUser, Task, TaskChanges, TaskQuery, User};

const TASK_COLUMNS: &str =
    "id, name, description, status, created_by, updated_by, assigned_to, created_at, updated_at";

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> Result<i32, AppError> {
        let (id,): (i32,) = sqlx::query_as(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::BadRequest(format!("username {} already exists", user.username))
            }
            other => other.into(),
        })?;
        Ok(id)
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}

pub struct PgTaskRepository {
    pool: PgPool,
}

impl PgTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn create(&self, changes: TaskChanges) -> Result<Task, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks (name, description, status, created_by, updated_by, assigned_to) \
             VALUES ($1, $2, $3, $4, $4, $5) RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.status)
        .bind(changes.user_id)
        .bind(changes.assigned_to)
        .fetch_one(&self.pool)
        .await?;
        Ok(task)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE id = $1",
            TASK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn list(&self, owner: i32, query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM tasks WHERE created_by = ",
            TASK_COLUMNS
        ));
        builder.push_bind(owner);

        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(assignee) = query.assignee {
            builder.push(" AND assigned_to = ").push_bind(assignee);
        }

        builder
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(query.limit())
            .push(" OFFSET ")
            .push_bind(query.offset());

        let tasks = builder
            .build_query_as::<Task>()
            .fetch_all(&self.pool)
            .await?;
        Ok(tasks)
    }

    async fn update_by_id(&self, id: i64, changes: TaskChanges) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks \
             SET name = $1, description = $2, status = $3, assigned_to = $4, \
                 updated_by = $5, updated_at = NOW() \
             WHERE id = $6 RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.status)
        .bind(changes.assigned_to)
        .bind(changes.user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
