//! In-memory repositories. Used by the test suites and for running the API
//! without PostgreSQL.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{TaskRepository, UserRepository};
use crate::error::AppError;
use crate::models::{NewUser, Task, TaskChanges, TaskQuery, User};

struct Table<T> {
    next_id: i64,
    rows: BTreeMap<i64, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

fn lock<T>(table: &Mutex<Table<T>>) -> Result<MutexGuard<'_, Table<T>>, AppError> {
    table
        .lock()
        .map_err(|_| AppError::InternalServerError("in-memory table lock poisoned".into()))
}

#[derive(Default)]
pub struct MemoryUserRepository {
    table: Mutex<Table<User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<i32, AppError> {
        let mut table = lock(&self.table)?;
        if table.rows.values().any(|u| u.username == user.username) {
            return Err(AppError::BadRequest(format!(
                "username {} already exists",
                user.username
            )));
        }
        let id = i32::try_from(table.allocate_id())
            .map_err(|_| AppError::InternalServerError("user id space exhausted".into()))?;
        table.rows.insert(
            i64::from(id),
            User {
                id,
                username: user.username,
                email: user.email,
                password_hash: user.password_hash,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<User>, AppError> {
        Ok(lock(&self.table)?.rows.get(&i64::from(id)).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(lock(&self.table)?
            .rows
            .values()
            .find(|u| u.username == username)
            .cloned())
    }
}

#[derive(Default)]
pub struct MemoryTaskRepository {
    table: Mutex<Table<Task>>,
}

impl MemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for MemoryTaskRepository {
    async fn create(&self, changes: TaskChanges) -> Result<Task, AppError> {
        let mut table = lock(&self.table)?;
        let now = Utc::now();
        let task = Task {
            id: table.allocate_id(),
            name: changes.name,
            description: changes.description,
            status: changes.status,
            created_by: changes.user_id,
            updated_by: changes.user_id,
            assigned_to: changes.assigned_to,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(task.id, task.clone());
        Ok(task)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Task>, AppError> {
        Ok(lock(&self.table)?.rows.get(&id).cloned())
    }

    async fn list(&self, owner: i32, query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        let table = lock(&self.table)?;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit()).unwrap_or(0);
        Ok(table
            .rows
            .values()
            .rev()
            .filter(|t| t.created_by == owner)
            .filter(|t| query.status.map_or(true, |s| t.status == s))
            .filter(|t| query.assignee.map_or(true, |a| t.assigned_to == Some(a)))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_by_id(&self, id: i64, changes: TaskChanges) -> Result<Option<Task>, AppError> {
        let mut table = lock(&self.table)?;
        Ok(table.rows.get_mut(&id).map(|task| {
            task.name = changes.name;
            task.description = changes.description;
            task.status = changes.status;
            task.assigned_to = changes.assigned_to;
            task.updated_by = changes.user_id;
            task.updated_at = Utc::now();
            task.clone()
        }))
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, AppError> {
        Ok(lock(&self.table)?.rows.remove(&id).is_some())
    }
}
