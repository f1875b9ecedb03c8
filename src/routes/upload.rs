/**
 * Upload Routes
 * Image upload to and deletion from the asset CDN
 */
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use std::sync::Arc;

use crate::assets::{AssetStore, DeleteImagesRequest, DeleteImagesResponse, LocalFile};
use crate::error::AssetError;
use crate::routes::auth::{require_admin, AuthConfig};
use crate::routes::{ApiError, ErrorResponse};

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];
/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct UploadState {
    pub assets: Arc<dyn AssetStore>,
    pub auth: AuthConfig,
    pub max_bytes: usize,
}

pub fn router(state: UploadState) -> Router {
    let body_limit = state.max_bytes + MULTIPART_OVERHEAD;
    Router::new()
        .route(
            "/api/upload",
            post(upload_image).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/delete-image", post(delete_images))
        .with_state(state)
}

fn validate_image_magic_bytes(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        // WebP: 52 49 46 46 ... 57 45 42 50
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

fn file_extension(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    }
}

fn asset_error(action: &str, err: AssetError) -> ApiError {
    match err {
        AssetError::Unavailable => {
            ErrorResponse::status(StatusCode::SERVICE_UNAVAILABLE, "Image storage not configured")
        }
        other => {
            tracing::error!(error = %other, "Failed to {}", action);
            ErrorResponse::status(StatusCode::BAD_GATEWAY, format!("Failed to {action}"))
        }
    }
}

/// Read and validate the `file` field of an upload.
async fn read_image(multipart: &mut Multipart, max_bytes: usize) -> Result<LocalFile, ApiError> {
    let field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => break field,
            Ok(Some(_)) => continue,
            Ok(None) => {
                return Err(ErrorResponse::status(
                    StatusCode::BAD_REQUEST,
                    "No file uploaded",
                ))
            }
            Err(e) => {
                tracing::error!("Multipart error: {}", e);
                return Err(ErrorResponse::status(
                    StatusCode::BAD_REQUEST,
                    "Invalid multipart data",
                ));
            }
        }
    };

    let file_name = field.file_name().unwrap_or("unknown").to_string();
    if !ALLOWED_EXTENSIONS.contains(&file_extension(&file_name).as_str()) {
        return Err(ErrorResponse::status(
            StatusCode::BAD_REQUEST,
            "Unsupported file type. Allowed: JPEG, PNG, WebP, GIF.",
        ));
    }

    let bytes = field.bytes().await.map_err(|e| {
        tracing::error!("Failed to read upload bytes: {}", e);
        ErrorResponse::status(StatusCode::BAD_REQUEST, "Failed to read file data")
    })?;

    if bytes.len() > max_bytes {
        return Err(ErrorResponse::status(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("File too large. Maximum size is {} bytes.", max_bytes),
        ));
    }

    if bytes.is_empty() {
        return Err(ErrorResponse::status(StatusCode::BAD_REQUEST, "Empty file"));
    }

    let Some(mime) = validate_image_magic_bytes(&bytes) else {
        return Err(ErrorResponse::status(
            StatusCode::BAD_REQUEST,
            "File content does not match an allowed image type.",
        ));
    };

    Ok(LocalFile::new(file_name, bytes).with_content_type(mime))
}

/// POST /api/upload (admin) - multipart `file` -> `{ url, externalId }`
pub async fn upload_image(
    State(state): State<UploadState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if let Err(err) = require_admin(&state.auth, &headers) {
        return err.into_response();
    }

    let file = match read_image(&mut multipart, state.max_bytes).await {
        Ok(file) => file,
        Err(err) => return err.into_response(),
    };

    match state.assets.upload(&file).await {
        Ok(image) => {
            tracing::info!(
                "Image uploaded: {} ({} bytes) -> {}",
                file.file_name,
                file.bytes.len(),
                image.external_id
            );
            (StatusCode::OK, Json(image)).into_response()
        }
        Err(e) => asset_error("upload image", e).into_response(),
    }
}

/// POST /api/delete-image (admin) - best-effort delete, one result per image
pub async fn delete_images(
    State(state): State<UploadState>,
    headers: HeaderMap,
    Json(request): Json<DeleteImagesRequest>,
) -> Response {
    if let Err(err) = require_admin(&state.auth, &headers) {
        return err.into_response();
    }

    let images = request.into_images();
    if images.is_empty() {
        return Json(DeleteImagesResponse::default()).into_response();
    }

    match state.assets.delete(&images).await {
        Ok(results) => {
            let failed = results.iter().filter(|r| !r.is_success()).count();
            tracing::info!("Deleted images: {} requested, {} failed", results.len(), failed);
            Json(DeleteImagesResponse { results }).into_response()
        }
        Err(e) => asset_error("delete images", e).into_response(),
    }
}
