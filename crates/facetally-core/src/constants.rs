//! Shared constants

/// Default lifetime of a published image link, in minutes.
pub const DEFAULT_URL_EXPIRY_MINUTES: u64 = 15;

/// Upper bound on a configured link lifetime (one year), in minutes.
pub const MAX_URL_EXPIRY_MINUTES: u64 = 60 * 24 * 365;

/// Detector started when `DETECTOR_COMMAND` is not set. Relative to the
/// working directory of the server.
pub const DEFAULT_DETECTOR_COMMAND: &str = "python3 scripts/face_detector.py";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default directory for uploaded files.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Multipart field carrying the uploaded image.
pub const UPLOAD_FIELD_NAME: &str = "image";

/// Query parameter carrying the access token on image links.
pub const ACCESS_TOKEN_QUERY_PARAM: &str = "expired";

/// Minimum length of a configured token secret, in bytes.
pub const MIN_TOKEN_SECRET_LEN: usize = 32;
