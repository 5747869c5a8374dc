//! File handlers for the Web API.

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::header,
    response::Response,
    Json,
};
use std::sync::Arc;
use utoipa;

use crate::file::{FileRecord, StoredFile};
use crate::web::dto::FileResponse;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Generate a safe Content-Disposition header value for file downloads.
///
/// Sanitizes the filename to prevent header injection and uses RFC 5987
/// encoding for non-ASCII filenames:
/// - Control characters (including CR, LF) are removed
/// - Double quotes and backslashes are replaced in the ASCII fallback
/// - Non-ASCII names get a `filename*` parameter with UTF-8 encoding
fn content_disposition_header(filename: &str) -> String {
    let needs_escaping =
        |c: char| c.is_control() || c == '"' || c == '\\';

    if filename.is_ascii() && !filename.chars().any(needs_escaping) {
        return format!("attachment; filename=\"{filename}\"");
    }

    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if c == '"' || c == '\\' { '_' } else { c })
        .collect();

    let encoded = urlencoding::encode(filename);

    format!("attachment; filename=\"{sanitized}\"; filename*=UTF-8''{encoded}")
}

/// POST /api/upload - Upload a file.
///
/// Request body: multipart/form-data with a single "file" field carrying the
/// file content and original filename.
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "files",
    responses(
        (status = 200, description = "File uploaded", body = FileResponse),
        (status = 400, description = "No file uploaded, invalid name, or file too large")
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<FileResponse>, ApiError> {
    let mut uploaded: Option<(String, StoredFile)> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        tracing::debug!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

        // Stream the field to disk, enforcing the size limit per chunk. The
        // pending upload removes the partial file on any early exit.
        let mut pending = state
            .storage
            .begin(&filename, state.max_upload_size)
            .await?;

        loop {
            match field.chunk().await {
                Ok(Some(chunk)) => pending.write_chunk(&chunk).await?,
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!("Upload stream aborted: {}", e);
                    return Err(ApiError::bad_request("Failed to read file"));
                }
            }
        }

        let stored = pending.commit().await?;
        uploaded = Some((filename, stored));
        break;
    }

    let (filename, stored) = uploaded.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    let record = FileRecord::from_upload(&filename, &stored);
    let record = match state.registry.append(record).await {
        Ok(record) => record,
        Err(e) => {
            tracing::error!("Failed to register uploaded file: {}", e);
            if let Err(e) = state.storage.remove(&stored.stored_name).await {
                tracing::warn!("Failed to clean up stored file: {}", e);
            }
            return Err(ApiError::internal("Failed to register file"));
        }
    };

    tracing::info!(
        filename = %record.filename,
        stored_name = %record.stored_name,
        size = record.size,
        "File uploaded"
    );

    Ok(Json(FileResponse::from(record)))
}

/// GET /api/files - List all uploaded files in upload order.
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    responses(
        (status = 200, description = "List of uploaded files", body = Vec<FileResponse>)
    )
)]
pub async fn list_files(State(state): State<Arc<AppState>>) -> Json<Vec<FileResponse>> {
    let records = state.registry.list_all().await;
    Json(records.into_iter().map(FileResponse::from).collect())
}

/// GET /api/download/:stored_name - Download a file.
#[utoipa::path(
    get,
    path = "/api/download/{stored_name}",
    tag = "files",
    params(
        ("stored_name" = String, Path, description = "Stored name of the file")
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 400, description = "Invalid stored name"),
        (status = 404, description = "File not found")
    )
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(stored_name): Path<String>,
) -> Result<Response<Body>, ApiError> {
    // Reject traversal attempts before consulting the registry
    crate::file::validate_stored_name(&stored_name)?;

    let record = state
        .registry
        .find_by_stored_name(&stored_name)
        .await
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    let content = state.storage.load(&record.stored_name).await?;

    let content_type = mime_guess::from_path(&record.filename)
        .first_or_octet_stream()
        .to_string();

    let response = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&record.filename),
        )
        .header(header::CONTENT_LENGTH, content.len())
        .body(Body::from(content))
        .map_err(|e| {
            tracing::error!("Failed to build download response: {}", e);
            ApiError::internal("Failed to build response")
        })?;

    Ok(response)
}
