use axum::{
    Extension, Json,
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{error, info};

use inkwell_types::api::{Claims, UploadResponse};

use crate::error::ApiError;
use crate::state::AppState;

/// 10 MB upload limit for cover images
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

const SEARCH_RESULTS: u32 = 12;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

/// GET /images/search?query=
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("missing query".into()))?;

    let images = state.images.search(query.trim(), SEARCH_RESULTS).await.map_err(|e| {
        error!("Image search '{}' failed: {:#}", query, e);
        ApiError::BadGateway("image search failed".into())
    })?;

    Ok(Json(images))
}

/// POST /images/upload: multipart form with a `file` field. Stored under the
/// upload directory and served from `/uploads/`.
pub async fn upload(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or("upload").to_string();
            let bytes = field.bytes().await.map_err(|e| {
                if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    ApiError::PayloadTooLarge
                } else {
                    ApiError::Validation(format!("failed to read file: {}", e))
                }
            })?;
            file = Some((name, bytes));
            break;
        }
    }

    let (name, bytes) = file.ok_or_else(|| ApiError::Validation("no file".into()))?;
    if bytes.is_empty() {
        return Err(ApiError::Validation("empty file".into()));
    }
    if bytes.len() > MAX_UPLOAD_SIZE {
        return Err(ApiError::PayloadTooLarge);
    }

    tokio::fs::create_dir_all(&state.upload_dir).await.map_err(|e| {
        error!("Failed to create upload directory {}: {}", state.upload_dir.display(), e);
        ApiError::Internal(e.into())
    })?;

    let stored_name = format!("{}-{}", chrono::Utc::now().timestamp_millis(), sanitize_file_name(&name));
    let path = state.upload_dir.join(&stored_name);
    tokio::fs::write(&path, &bytes).await.map_err(|e| {
        error!("Failed to write {}: {}", path.display(), e);
        ApiError::Internal(e.into())
    })?;

    info!("{} uploaded {} ({} bytes)", claims.username, stored_name, bytes.len());
    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            url: format!("/uploads/{}", stored_name),
        }),
    ))
}

/// Keep only the final path component; whitespace becomes `-` and anything
/// outside `[A-Za-z0-9._-]` is dropped.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_whitespace() => Some('-'),
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => Some(c),
            _ => None,
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_cannot_escape_upload_dir() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\temp\\cover.png"), "cover.png");
        assert_eq!(sanitize_file_name(".."), "upload");
    }

    #[test]
    fn whitespace_becomes_hyphens() {
        assert_eq!(sanitize_file_name("my cover photo.jpg"), "my-cover-photo.jpg");
        assert_eq!(sanitize_file_name("été.png"), "t.png");
    }
}
