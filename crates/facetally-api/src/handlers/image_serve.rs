use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
};
use facetally_core::AppError;
use futures::StreamExt;
use serde::Deserialize;

use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::parse_image_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    /// Access token minted by the result endpoint
    pub expired: Option<String>,
}

/// Stream the original image if the link's token is valid and unexpired.
#[utoipa::path(
    get,
    path = "/image/{id}",
    tag = "images",
    params(
        ("id" = String, Path, description = "Image ID"),
        ("expired" = String, Query, description = "Access token from the result endpoint")
    ),
    responses(
        (status = 200, description = "Image bytes with the stored content type"),
        (status = 400, description = "Invalid or expired link", body = ErrorResponse),
        (status = 404, description = "Unknown image id", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query), fields(operation = "serve_image"))]
pub async fn serve_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ImageQuery>,
) -> Result<Response, HttpAppError> {
    let id = parse_image_id(&id)?;
    let token = query
        .expired
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::InvalidToken("missing access token".to_string()))?;

    let resolved = state.lifecycle.resolve_access(id, token)?;

    let content_length = state.storage.content_length(&resolved.storage_key).await?;
    let stream = state
        .storage
        .download_stream(&resolved.storage_key)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, storage_key = %resolved.storage_key, "Failed to retrieve file from storage");
            HttpAppError::from(e)
        })?;

    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, resolved.content_type.as_str())
        .header(header::CONTENT_LENGTH, content_length)
        .header(header::CACHE_CONTROL, "private, no-cache")
        .body(Body::from_stream(body_stream))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            HttpAppError::from(AppError::Internal(e.to_string()))
        })?;

    Ok(response)
}
