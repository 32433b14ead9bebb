use crate::{
    auth::AuthenticatedUserId,
    error::AppError,
    models::{Task, TaskChanges, TaskInput, TaskQuery},
    repository::TaskRepository,
};
use actix_web::{delete, get, patch, post, put, web, HttpResponse, Responder};
use validator::Validate;

/// Loads task `id` if the user created it. Someone else's task is reported
/// as missing.
async fn owned_task(
    tasks: &dyn TaskRepository,
    id: i64,
    user_id: i32,
) -> Result<Task, AppError> {
    match tasks.get_by_id(id).await? {
        Some(task) if task.created_by == user_id => Ok(task),
        _ => Err(AppError::NotFound("Task not found".into())),
    }
}

/// Retrieves a list of tasks for the authenticated user.
///
/// Only tasks the user created are listed, newest first.
///
/// ## Query Parameters:
/// - `status` (optional): Filters tasks by status (e.g., "created", "started", "done").
/// - `assignee` (optional): Filters tasks by the ID of the user they are assigned to.
/// - `limit` (optional): Page size, 20 by default and at most 100.
/// - `offset` (optional): Number of tasks to skip.
///
/// ## Responses:
/// - `200 OK`: Returns a JSON array of `Task` objects.
/// - `401 Unauthorized`: If the request lacks a live access token.
#[get("")]
pub async fn get_tasks(
    tasks: web::Data<dyn TaskRepository>,
    query_params: web::Query<TaskQuery>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let tasks = tasks.list(user_id.0, &query_params).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a new task owned by the authenticated user.
///
/// ## Responses:
/// - `201 Created`: Returns the newly created `Task` object as JSON.
/// - `401 Unauthorized`: If the request lacks a live access token.
/// - `422 Unprocessable Entity`: If input validation on `TaskInput` fails.
#[post("")]
pub async fn create_task(
    tasks: web::Data<dyn TaskRepository>,
    task_data: web::Json<TaskInput>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task = tasks
        .create(TaskChanges::from_input(task_data.into_inner(), user_id.0))
        .await?;
    log::debug!("user {} created task {}", user_id.0, task.id);

    Ok(HttpResponse::Created().json(task))
}

/// Retrieves a specific task by its ID.
///
/// ## Responses:
/// - `200 OK`: Returns the `Task` object as JSON.
/// - `404 Not Found`: If the task does not exist or is not owned by the user.
#[get("/{id}")]
pub async fn get_task(
    tasks: web::Data<dyn TaskRepository>,
    task_id: web::Path<i64>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let task = owned_task(tasks.get_ref(), task_id.into_inner(), user_id.0).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Replaces an existing task.
///
/// ## Responses:
/// - `200 OK`: Returns the updated `Task` object as JSON.
/// - `404 Not Found`: If the task does not exist or is not owned by the user.
/// - `422 Unprocessable Entity`: If input validation on `TaskInput` fails.
#[put("/{id}")]
pub async fn update_task(
    tasks: web::Data<dyn TaskRepository>,
    task_id: web::Path<i64>,
    task_data: web::Json<TaskInput>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;
    let task = owned_task(tasks.get_ref(), task_id.into_inner(), user_id.0).await?;

    let updated = tasks
        .update_by_id(task.id, TaskChanges::from_input(task_data.into_inner(), user_id.0))
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Archives a task by moving it to the `canceled` status.
#[patch("/{id}/archive")]
pub async fn archive_task(
    tasks: web::Data<dyn TaskRepository>,
    task_id: web::Path<i64>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let task = owned_task(tasks.get_ref(), task_id.into_inner(), user_id.0).await?;

    let archived = tasks
        .update_by_id(task.id, TaskChanges::archive(&task, user_id.0))
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    Ok(HttpResponse::Ok().json(archived))
}

/// Deletes a task by its ID.
///
/// ## Responses:
/// - `204 No Content`: On successful deletion.
/// - `404 Not Found`: If the task does not exist or is not owned by the user.
#[delete("/{id}")]
pub async fn delete_task(
    tasks: web::Data<dyn TaskRepository>,
    task_id: web::Path<i64>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let task = owned_task(tasks.get_ref(), task_id.into_inner(), user_id.0).await?;

    if !tasks.delete_by_id(task.id).await? {
        return Err(AppError::NotFound("Task not found".into()));
    }

    Ok(HttpResponse::NoContent().finish())
}
