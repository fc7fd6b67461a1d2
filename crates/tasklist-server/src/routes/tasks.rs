//! Task endpoints.
//!
//! Every handler is scoped to the caller's [`Identity`]; the store filters
//! each query on the subject, so a caller only ever sees or touches its own
//! rows.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use tasklist_types::{CreateTaskRequest, Task, TaskId, UpdateTaskRequest};
use tracing::{debug, info};

use crate::auth::Identity;
use crate::error::ServerError;
use crate::state::AppState;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServerError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ServerError::BadRequest(e.body_text()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/tasks - List the caller's tasks, newest first.
pub async fn list_tasks_handler(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<Task>>, ServerError> {
    let tasks = state.store.list_tasks(&identity.subject).await?;
    debug!(subject = %identity.subject, count = tasks.len(), "Listed tasks");
    Ok(Json(tasks))
}

/// POST /api/tasks - Create a task.
pub async fn create_task_handler(
    State(state): State<AppState>,
    identity: Identity,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ServerError> {
    let request = body(payload)?;
    let task = state
        .store
        .create_task(&identity.subject, &request.text)
        .await?;

    info!(task_id = %task.id, subject = %identity.subject, "Task created");
    Ok((StatusCode::CREATED, Json(task)))
}

/// PATCH /api/tasks/{id} - Set the completion flag.
pub async fn update_task_handler(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<Task>, ServerError> {
    let request = body(payload)?;
    let id = TaskId::new(id);

    state
        .store
        .set_completed(&identity.subject, &id, request.completed)
        .await?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("Task {} not found", id)))
}

/// DELETE /api/tasks/{id} - Delete a task.
///
/// Answers 204 whether or not a row matched, so callers cannot tell which
/// task ids belong to other subjects.
pub async fn delete_task_handler(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    let id = TaskId::new(id);
    let deleted = state.store.delete_task(&identity.subject, &id).await?;

    debug!(task_id = %id, subject = %identity.subject, deleted, "Task delete");
    Ok(StatusCode::NO_CONTENT)
}
