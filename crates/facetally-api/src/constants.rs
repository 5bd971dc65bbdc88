//! API constants

/// Path of the served OpenAPI document.
pub const OPENAPI_PATH: &str = "/api/openapi.json";

/// Slack added on top of the file size limit for multipart framing.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Header carrying the request identifier.
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";
