pub mod health;
pub mod image_check;
pub mod image_result;
pub mod image_serve;
pub mod image_upload;

use facetally_core::AppError;
use uuid::Uuid;

/// Parse an image id from the path. Malformed ids are indistinguishable from
/// unknown ones.
pub(crate) fn parse_image_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("image id not exist".to_string()))
}
