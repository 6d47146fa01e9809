//! Endpoints for uploading and downloading task attachments.
//!
//! POST /tasks/{id}/files — multipart upload bound to a caller-owned task
//! GET /files/{id} — download the stored copy (returns raw binary)

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::middleware::Claims;
use crate::state::AppState;
use crate::store::models::FileRecord;

#[derive(Debug, Serialize)]
pub struct FileUploadResponse {
    pub id: String,
    pub filename: String,
}

/// POST /tasks/{id}/files
///
/// Attach an uploaded file to a task. Multipart body with a `file` part; the
/// task must exist and belong to the caller. The stored copy is written to
/// `<data_dir>/uploads/<record-id>_<filename>`.
pub async fn upload_file(
    State(state): State<AppState>,
    claims: Claims,
    Path(task_id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FileUploadResponse>), (StatusCode, String)> {
    state
        .store
        .task_for_owner(&task_id, &claims.sub)
        .ok_or((StatusCode::NOT_FOUND, "Task not found".to_string()))?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.bin").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read upload: {}", e)))?;
        upload = Some((filename, data.to_vec()));
        break;
    }
    let (filename, data) =
        upload.ok_or((StatusCode::BAD_REQUEST, "Missing `file` part".to_string()))?;

    let max_upload_bytes = state.max_upload_size_mb as u64 * 1024 * 1024;
    if data.len() as u64 > max_upload_bytes {
        return Err((
            StatusCode::PAYLOAD_TOO_LARGE,
            format!(
                "Upload of {} bytes exceeds the {} MB limit",
                data.len(),
                state.max_upload_size_mb
            ),
        ));
    }

    let id = Uuid::now_v7().to_string();
    let stored_path =
        std::path::Path::new(&state.upload_dir).join(format!("{}_{}", id, sanitize_filename(&filename)));

    tokio::fs::write(&stored_path, &data).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to store upload: {}", e),
        )
    })?;

    let record = state.store.insert_file(FileRecord {
        id: id.clone(),
        filename,
        path: stored_path.to_string_lossy().into_owned(),
        task_id,
        owner_id: claims.sub,
        created_at: Utc::now(),
    });

    tracing::info!(
        file_id = %record.id,
        task_id = %record.task_id,
        size = data.len(),
        "attachment stored"
    );

    Ok((
        StatusCode::CREATED,
        Json(FileUploadResponse {
            id: record.id,
            filename: record.filename,
        }),
    ))
}

/// GET /files/{id}
///
/// Download a stored attachment as raw bytes with
/// `Content-Type: application/octet-stream`. 404 unless caller-owned.
pub async fn download_file(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let record = state
        .store
        .file_for_owner(&id, &claims.sub)
        .ok_or((StatusCode::NOT_FOUND, "File not found".to_string()))?;

    let data = tokio::fs::read(&record.path).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to read stored file: {}", e),
        )
    })?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/octet-stream".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", record.filename),
            ),
        ],
        data,
    ))
}

/// Strip path separators so a client-supplied filename cannot escape the
/// upload directory.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}
