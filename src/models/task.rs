use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Lifecycle state of a task.
/// Corresponds to the `task_status` SQL enum.
#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Created,
    Started,
    Done,
    Failed,
    Delayed,
    /// Archived tasks end up here.
    Canceled,
}

/// Input structure for creating or replacing a task.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    /// Maximum length of 1000 characters.
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub description: String,

    /// Defaults to `created` when omitted.
    #[serde(default)]
    pub status: TaskStatus,

    pub assigned_to: Option<i32>,
}

/// A task as stored in the database and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    /// User who created (and owns) the task.
    pub created_by: i32,
    /// User who last changed the task.
    pub updated_by: i32,
    pub assigned_to: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column values written on insert or replace.
#[derive(Debug, Clone)]
pub struct TaskChanges {
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub assigned_to: Option<i32>,
    /// The acting user.
    pub user_id: i32,
}

impl TaskChanges {
    pub fn from_input(input: TaskInput, user_id: i32) -> Self {
        Self {
            name: input.name,
            description: input.description,
            status: input.status,
            assigned_to: input.assigned_to,
            user_id,
        }
    }

    /// Changes that archive `task` on behalf of `user_id`.
    pub fn archive(task: &Task, user_id: i32) -> Self {
        Self {
            name: task.name.clone(),
            description: task.description.clone(),
            status: TaskStatus::Canceled,
            assigned_to: task.assigned_to,
            user_id,
        }
    }
}

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Query parameters for listing tasks. Passed through to the repository as-is
/// apart from clamping the page window.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    pub assignee: Option<i32>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TaskQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}
