use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use facetally_core::models::{GeneralResponse, ResultResponse};

use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::parse_image_id;
use crate::state::AppState;

/// Publish a time-limited link to the original image.
///
/// Detection is attempted first; its failure does not prevent the link.
#[utoipa::path(
    get,
    path = "/result/{id}",
    tag = "images",
    params(
        ("id" = String, Path, description = "Image ID returned by upload")
    ),
    responses(
        (status = 200, description = "Signed image link", body = ResultResponse),
        (status = 404, description = "Unknown image id", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "image_result"))]
pub async fn image_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ResultResponse>, HttpAppError> {
    let id = parse_image_id(&id)?;
    let link = state
        .lifecycle
        .issue_access_link(id, state.config.url_expiry())
        .await?;

    tracing::debug!(image_id = %id, expires_at = link.expires_at, "Image link issued");

    Ok(Json(ResultResponse {
        general: GeneralResponse::ok("image id found"),
        image_url: link.url,
    }))
}
