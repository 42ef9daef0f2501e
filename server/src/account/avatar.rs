//! Avatar upload and serving.
//!
//! Uploaded images are written under `{data_dir}/avatars/` with a fresh
//! UUID filename and referenced by `/avatars/{filename}` URLs.

use axum::{
    extract::{Multipart, Path as UrlPath, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::auth::middleware::Claims;
use crate::state::AppState;

/// Maximum accepted avatar size (5 MiB).
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub avatar_url: String,
}

/// Compute the avatars storage directory path.
fn avatars_dir(data_dir: &str) -> PathBuf {
    Path::new(data_dir).join("avatars")
}

/// File extension for an accepted image content type.
fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Content type for a stored avatar file, by extension.
fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit('.').next() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// PUT /users/profile/upload
/// Multipart upload with an `image` field. Writes the file, updates the
/// caller's avatar_url, and returns the new URL.
pub async fn upload_avatar(
    State(state): State<AppState>,
    claims: Claims,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, (StatusCode, String)> {
    let mut image: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_default();
        let data = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read image field: {}", e)))?;

        image = Some((content_type, data.to_vec()));
    }

    let (content_type, data) = image.ok_or((
        StatusCode::BAD_REQUEST,
        "An image field is required".to_string(),
    ))?;

    let ext = extension_for(&content_type).ok_or((
        StatusCode::BAD_REQUEST,
        format!("Unsupported image type: {}", content_type),
    ))?;

    if data.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Image is empty".to_string()));
    }
    if data.len() > MAX_AVATAR_BYTES {
        return Err((StatusCode::BAD_REQUEST, "Image is too large".to_string()));
    }

    let db = state.db.clone();
    let data_dir = state.data_dir.clone();
    let user_id = claims.sub.clone();
    let filename = format!("{}.{}", Uuid::now_v7(), ext);
    let avatar_url = format!("/avatars/{}", filename);
    let url_for_db = avatar_url.clone();

    tokio::task::spawn_blocking(move || {
        let dir = avatars_dir(&data_dir);
        std::fs::create_dir_all(&dir).map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Create avatars dir: {}", e),
            )
        })?;
        std::fs::write(dir.join(&filename), &data).map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Write avatar: {}", e),
            )
        })?;

        let conn = db
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "DB lock".to_string()))?;

        let now = Utc::now().to_rfc3339();
        let rows = conn
            .execute(
                "UPDATE users SET avatar_url = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![url_for_db, now, user_id],
            )
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update avatar: {}", e)))?;

        if rows == 0 {
            return Err((StatusCode::UNAUTHORIZED, "User no longer exists".to_string()));
        }

        Ok::<_, (StatusCode, String)>(())
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join: {}", e)))??;

    // TODO: garbage-collect replaced avatar files

    Ok(Json(UploadResponse {
        message: "Profile picture updated successfully".to_string(),
        avatar_url,
    }))
}

/// GET /avatars/{filename}
/// Serve a stored avatar file.
pub async fn get_avatar(
    State(state): State<AppState>,
    UrlPath(filename): UrlPath<String>,
) -> Result<Response, StatusCode> {
    // Single path segment only; refuse anything that could escape the dir
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err(StatusCode::NOT_FOUND);
    }

    let path = avatars_dir(&state.data_dir).join(&filename);
    let bytes = tokio::task::spawn_blocking(move || std::fs::read(&path))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .map_err(|_| StatusCode::NOT_FOUND)?;

    let content_type = content_type_for(&filename);
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}
