//! Profile picture upload and download.
//!
//! PUT /api/user/profile-picture: raw image body, `Content-Type: image/*`
//! GET /uploads/profile_pictures/{file}: serve a stored picture
//!
//! Files are content-addressed: the name is the SHA-256 of the bytes plus
//! an extension derived from the content type.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path as FsPath, PathBuf};

use crate::auth::middleware::Claims;
use crate::state::AppState;

/// URL prefix under which stored pictures are served.
pub const PUBLIC_PREFIX: &str = "/uploads/profile_pictures";

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfilePictureResponse {
    pub profile_picture: String,
}

/// Map an accepted content type to its file extension.
fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

fn content_type_for(extension: &str) -> Option<&'static str> {
    match extension {
        "png" => Some("image/png"),
        "jpg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

pub fn storage_dir(data_dir: &FsPath) -> PathBuf {
    data_dir.join("uploads").join("profile_pictures")
}

/// Accept only names this module produces: `<64 hex>.<known ext>`.
fn parse_file_name(file: &str) -> Option<&'static str> {
    let (stem, extension) = file.split_once('.')?;
    if stem.len() != 64 || !stem.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    content_type_for(extension)
}

/// PUT /api/user/profile-picture
pub async fn upload_profile_picture(
    State(state): State<AppState>,
    claims: Claims,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ProfilePictureResponse>, (StatusCode, String)> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_lowercase())
        .ok_or((
            StatusCode::BAD_REQUEST,
            "Missing Content-Type header".to_string(),
        ))?;

    let extension = extension_for(&content_type).ok_or((
        StatusCode::UNSUPPORTED_MEDIA_TYPE,
        format!("Unsupported image type {}", content_type),
    ))?;

    if body.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Empty image".to_string()));
    }
    let max_bytes = state.max_avatar_size_kb * 1024;
    if body.len() > max_bytes {
        return Err((
            StatusCode::PAYLOAD_TOO_LARGE,
            format!(
                "Image size {} bytes exceeds maximum of {} KiB",
                body.len(),
                state.max_avatar_size_kb
            ),
        ));
    }

    let file_name = format!("{}.{}", hex::encode(Sha256::digest(&body)), extension);
    let dir = storage_dir(&state.data_dir);
    let path = dir.join(&file_name);

    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        std::fs::create_dir_all(&dir)?;
        if !path.exists() {
            std::fs::write(&path, &body)?;
        }
        Ok(())
    })
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Task join error: {}", e),
        )
    })?
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to store profile picture");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to store image".to_string(),
        )
    })?;

    let url = format!("{}/{}", PUBLIC_PREFIX, file_name);
    if !state.store.set_profile_picture(&claims.sub, &url).await? {
        return Err((StatusCode::NOT_FOUND, "User not found".to_string()));
    }

    tracing::info!(user_id = %claims.sub, file = %file_name, "Profile picture updated");

    Ok(Json(ProfilePictureResponse {
        profile_picture: url,
    }))
}

/// GET /uploads/profile_pictures/{file}
/// Public so image tags can load it without an Authorization header.
pub async fn get_profile_picture(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<(HeaderMap, Vec<u8>), StatusCode> {
    let content_type = parse_file_name(&file).ok_or(StatusCode::NOT_FOUND)?;
    let path = storage_dir(&state.data_dir).join(&file);

    let data = tokio::fs::read(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StatusCode::NOT_FOUND
        } else {
            tracing::error!(error = %e, "Failed to read profile picture");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );
    Ok((headers, data))
}
