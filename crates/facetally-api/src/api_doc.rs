//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use facetally_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Facetally API",
        version = "0.1.0",
        description = "Upload an image, get its face count on demand, and share it through a signed link that expires."
    ),
    paths(
        handlers::image_upload::upload_image,
        handlers::image_check::check_image,
        handlers::image_result::image_result,
        handlers::image_serve::serve_image,
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::GeneralResponse,
            models::UploadResponse,
            models::CheckResponse,
            models::ResultResponse,
            models::HealthResponse,
            models::ImageState,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "images", description = "Image upload, face counting and signed delivery"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in ["/upload", "/check/{id}", "/result/{id}", "/image/{id}", "/health"] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
