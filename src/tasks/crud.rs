use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::Claims;
use crate::state::AppState;
use crate::store::models::{Task, TaskStatus};

// --- Request/response types ---

#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            deadline: task.deadline,
            owner_id: task.owner_id,
            created_at: task.created_at,
        }
    }
}

fn validated_title(title: &str) -> Result<String, (StatusCode, String)> {
    let title = title.trim();
    if title.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Title cannot be empty".to_string()));
    }
    Ok(title.to_string())
}

// --- Handlers ---

/// POST /tasks — Create a task owned by the caller.
pub async fn create_task(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<TaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), (StatusCode, String)> {
    let title = validated_title(&req.title)?;

    let task = state.store.insert_task(Task {
        id: Uuid::now_v7().to_string(),
        title,
        description: req.description,
        status: req.status.unwrap_or_default(),
        deadline: req.deadline,
        owner_id: claims.sub,
        created_at: Utc::now(),
    });

    tracing::info!(task_id = %task.id, owner_id = %task.owner_id, "task created");

    Ok((StatusCode::CREATED, Json(task.into())))
}

/// GET /tasks — List the caller's tasks, oldest first.
pub async fn list_tasks(
    State(state): State<AppState>,
    claims: Claims,
) -> Json<Vec<TaskResponse>> {
    let tasks = state
        .store
        .tasks_for_owner(&claims.sub)
        .into_iter()
        .map(TaskResponse::from)
        .collect();
    Json(tasks)
}

/// GET /tasks/{id} — Fetch one of the caller's tasks.
pub async fn get_task(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, StatusCode> {
    state
        .store
        .task_for_owner(&id, &claims.sub)
        .map(|task| Json(task.into()))
        .ok_or(StatusCode::NOT_FOUND)
}

/// PUT /tasks/{id} — Replace a task's mutable fields.
pub async fn update_task(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<String>,
    Json(req): Json<TaskRequest>,
) -> Result<Json<TaskResponse>, (StatusCode, String)> {
    let existing = state
        .store
        .task_for_owner(&id, &claims.sub)
        .ok_or((StatusCode::NOT_FOUND, "Task not found".to_string()))?;

    let title = validated_title(&req.title)?;

    let task = state.store.insert_task(Task {
        title,
        description: req.description,
        status: req.status.unwrap_or(existing.status),
        deadline: req.deadline,
        ..existing
    });

    tracing::info!(task_id = %task.id, "task updated");

    Ok(Json(task.into()))
}

/// DELETE /tasks/{id} — Remove a task and its attachments.
pub async fn delete_task(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let (task, orphaned) = state
        .store
        .remove_task(&id, &claims.sub)
        .ok_or(StatusCode::NOT_FOUND)?;

    // Attachment records are gone from the store; remove the stored copies.
    for file in orphaned {
        if let Err(err) = tokio::fs::remove_file(&file.path).await {
            tracing::warn!(file_id = %file.id, error = %err, "failed to remove stored attachment");
        }
    }

    tracing::info!(task_id = %task.id, "task deleted");

    Ok(StatusCode::NO_CONTENT)
}
