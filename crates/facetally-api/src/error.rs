//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Domain errors
//! (`AppError`, `StorageError`, `DetectionError`, `LifecycleError`) convert into
//! `HttpAppError` with `?`, so every failure renders the same body shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use facetally_core::{AppError, ErrorMetadata, LogLevel};
use facetally_detection::DetectionError;
use facetally_storage::StorageError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::services::lifecycle::LifecycleError;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status code, repeated in the body
    pub code: u16,
    pub message: String,
    /// Machine-readable error code for programmatic handling
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from facetally-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

fn build_error_response(app_error: &AppError, is_production: bool) -> ErrorResponse {
    let hide_details = is_production || app_error.is_sensitive();
    ErrorResponse {
        code: app_error.http_status_code(),
        message: app_error.client_message(),
        error: app_error.error_code().to_string(),
        error_type: (!hide_details).then(|| app_error.error_type().to_string()),
        details: (!hide_details).then(|| app_error.detailed_message()),
        recoverable: app_error.is_recoverable(),
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let body = build_error_response(app_error, is_production_env());
        (status, Json(body)).into_response()
    }
}

// Convert domain errors to HttpAppError (avoids orphan rule: we impl for local HttpAppError)

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        let app = match err {
            StorageError::NotFound(msg) => AppError::NotFound(format!("image file not found ({})", msg)),
            StorageError::UploadFailed(msg) => AppError::Storage(msg),
            StorageError::DownloadFailed(msg) => AppError::Storage(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::IoError(err) => AppError::Internal(format!("IO error: {}", err)),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
        };
        HttpAppError(app)
    }
}

impl From<DetectionError> for HttpAppError {
    fn from(err: DetectionError) -> Self {
        HttpAppError(err.into())
    }
}

impl From<LifecycleError> for HttpAppError {
    fn from(err: LifecycleError) -> Self {
        HttpAppError(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_storage_error_not_found() {
        let HttpAppError(app_err) = StorageError::NotFound("a.png".to_string()).into();
        match app_err {
            AppError::NotFound(msg) => assert!(msg.contains("a.png")),
            _ => panic!("Expected NotFound variant"),
        }
    }

    #[test]
    fn test_from_storage_error_upload_failed() {
        let HttpAppError(app_err) = StorageError::UploadFailed("disk full".to_string()).into();
        match app_err {
            AppError::Storage(msg) => assert_eq!(msg, "disk full"),
            _ => panic!("Expected Storage variant"),
        }
    }

    #[test]
    fn test_from_storage_error_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let HttpAppError(app_err) = StorageError::IoError(io_err).into();
        match app_err {
            AppError::Internal(msg) => assert!(msg.contains("IO error")),
            _ => panic!("Expected Internal variant"),
        }
    }

    #[test]
    fn test_from_detection_error() {
        let HttpAppError(app_err) = DetectionError::Unavailable("gone".to_string()).into();
        assert!(matches!(app_err, AppError::DetectionUnavailable(_)));
    }

    #[test]
    fn test_error_response_hides_sensitive_details() {
        let err = AppError::Storage("/var/lib/uploads is read-only".to_string());
        let body = build_error_response(&err, false);
        assert_eq!(body.code, 500);
        assert_eq!(body.message, "Failed to access storage");
        assert!(body.details.is_none());
        assert!(body.error_type.is_none());
    }

    #[test]
    fn test_error_response_shape() {
        let err = AppError::Expired { expired_at: 10 };
        let body = build_error_response(&err, false);
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["code"], 400);
        assert_eq!(json["message"], "url expired");
        assert_eq!(json["error"], "URL_EXPIRED");
        assert_eq!(json["error_type"], "Expired");
        assert_eq!(json["recoverable"], false);

        let body = build_error_response(&err, true);
        let json = serde_json::to_value(&body).expect("serialize");
        assert!(json.get("details").is_none());
        assert!(json.get("error_type").is_none());
    }
}
