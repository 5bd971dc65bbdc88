use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use facetally_core::models::{CheckResponse, GeneralResponse};

use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::parse_image_id;
use crate::state::AppState;

/// Face count for an uploaded image, detecting on first request.
#[utoipa::path(
    get,
    path = "/check/{id}",
    tag = "images",
    params(
        ("id" = String, Path, description = "Image ID returned by upload")
    ),
    responses(
        (status = 200, description = "Face count", body = CheckResponse),
        (status = 404, description = "Unknown image id", body = ErrorResponse),
        (status = 500, description = "Detector returned an unexpected result", body = ErrorResponse),
        (status = 503, description = "Detector unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "check_image"))]
pub async fn check_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CheckResponse>, HttpAppError> {
    let id = parse_image_id(&id)?;
    let face_count = state.lifecycle.ensure_processed(id).await?;

    Ok(Json(CheckResponse {
        general: GeneralResponse::ok("image id found"),
        face_count,
    }))
}
