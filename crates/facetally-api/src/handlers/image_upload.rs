use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use facetally_core::constants::UPLOAD_FIELD_NAME;
use facetally_core::models::{GeneralResponse, ImageMetadata, UploadResponse};

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::{
    choose_extension, extract_multipart_file, sanitize_filename, sniff_image_format,
    validate_file_size,
};

/// Upload image handler
///
/// Stores the file sent in the `image` multipart field and registers it. Face
/// detection does not run here; it happens on the first check or result call.
///
/// # Errors
/// - `AppError::InvalidInput` - Missing field or empty file
/// - `AppError::PayloadTooLarge` - File exceeds size limit
/// - `AppError::UnsupportedMediaType` - Content is not an allowed image type
/// - `AppError::Storage` - Storage upload failure
#[utoipa::path(
    post,
    path = "/upload",
    tag = "images",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image uploaded", body = UploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 415, description = "Not an image", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_image"))]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    let file = extract_multipart_file(multipart, UPLOAD_FIELD_NAME).await?;

    validate_file_size(file.data.len(), state.config.max_file_size_bytes())?;
    let (format, content_type) =
        sniff_image_format(&file.data, state.config.allowed_content_types())?;

    let original_filename = sanitize_filename(&file.filename)?;
    let extension = choose_extension(&original_filename, format);
    let file_size = file.data.len() as u64;

    tracing::debug!(
        filename = %original_filename,
        declared_content_type = %file.declared_content_type,
        content_type = %content_type,
        size_bytes = file_size,
        "Upload validated"
    );

    let storage_key = state
        .storage
        .upload(&extension, content_type, file.data)
        .await?;

    let id = state.lifecycle.ingest(
        storage_key,
        ImageMetadata {
            original_filename,
            content_type: content_type.to_string(),
            file_size,
        },
    );

    Ok(Json(UploadResponse {
        general: GeneralResponse::ok("image uploaded"),
        id,
    }))
}
