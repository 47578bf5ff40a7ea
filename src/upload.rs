//! Image upload for the dashboard
//!
//! Accepts one image per request as the multipart field `file`, writes it to
//! the configured upload directory under a generated name and returns the
//! public URL. Files are served back from `/uploads/`. Each request is
//! independent: a form that uploads several images and fails half-way keeps
//! the images that already succeeded.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use tokio::fs;
use tracing::info;

use crate::database::AppState;
use crate::error::ApiError;
use crate::model::{DocumentId, Session};

/// Route prefix the upload directory is served under.
pub const UPLOADS_ROUTE: &str = "/uploads";

/// Maps an accepted image content type to the extension stored on disk.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

fn size_limit_message(limit: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * KIB;

    let size = if limit >= MIB && limit % MIB == 0 {
        format!("{}MB", limit / MIB)
    } else if limit >= MIB {
        format!("{:.1}MB", limit as f64 / MIB as f64)
    } else if limit >= KIB && limit % KIB == 0 {
        format!("{}KB", limit / KIB)
    } else {
        format!("{} bytes", limit)
    };
    format!("File size should be less than {}", size)
}

/// Uploads an image
///
/// # Request
///
/// `multipart/form-data` with a single `file` field (JPEG, PNG, GIF or WebP).
///
/// # Response
///
/// - **200 OK** - `{ "success": true, "url": "http://host/uploads/<id>.jpg" }`
/// - **400 Bad Request** - no file, empty file, unsupported type or over the limit
/// - **413 Payload Too Large** - request body far beyond the limit
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut multipart = multipart?;
    let limit = state.config.max_upload_bytes;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let extension = image_extension(&content_type).ok_or_else(|| {
            ApiError::Validation("Please select a valid image file (JPEG, PNG, GIF, WebP)".into())
        })?;

        let data = field.bytes().await?;
        if data.is_empty() {
            return Err(ApiError::Validation("Uploaded file is empty".into()));
        }
        if data.len() > limit {
            return Err(ApiError::Validation(size_limit_message(limit)));
        }

        let file_name = format!("{}.{}", DocumentId::generate(), extension);
        let upload_dir = &state.config.upload_dir;
        fs::create_dir_all(upload_dir)
            .await
            .map_err(|err| ApiError::Internal(format!("creating upload dir: {}", err)))?;
        fs::write(upload_dir.join(&file_name), &data)
            .await
            .map_err(|err| ApiError::Internal(format!("writing upload: {}", err)))?;

        let url = format!(
            "{}{}/{}",
            state.config.public_base_url.trim_end_matches('/'),
            UPLOADS_ROUTE,
            file_name
        );
        info!(file = %file_name, bytes = data.len(), by = %session.username, "stored upload");

        return Ok(Json(json!({ "success": true, "url": url })));
    }

    Err(ApiError::Validation("No file uploaded".into()))
}
