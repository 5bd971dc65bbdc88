//! Detector capability trait and its error taxonomy.

use async_trait::async_trait;
use facetally_core::AppError;
use std::fmt::Debug;
use std::path::Path;
use thiserror::Error;

/// Detection failures surfaced to callers.
///
/// None of these transition an image to processed; the next request retries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DetectionError {
    /// The detector is not running, crashed, or has been shut down
    #[error("Detector unavailable: {0}")]
    Unavailable(String),

    /// The detector answered with something other than a non-negative integer
    #[error("Detector returned an unexpected result: {0}")]
    BadResult(String),

    /// The stored image could not be found at the storage layer
    #[error("Image not found in storage: {0}")]
    NotFound(String),
}

/// External face counting capability.
///
/// Implementations are not required to be re-entrant: the gateway holds the
/// only handle and never issues two calls at once. `shutdown` is called at
/// most once, after which the detector is dropped.
#[async_trait]
pub trait Detector: Send + Debug {
    /// Detector name used in logs
    fn name(&self) -> &str;

    /// Count the faces in the image stored at `path`.
    async fn detect(&mut self, path: &Path) -> Result<u32, DetectionError>;

    /// Release the underlying resources.
    async fn shutdown(&mut self) -> Result<(), DetectionError> {
        Ok(())
    }
}

impl From<DetectionError> for AppError {
    fn from(err: DetectionError) -> Self {
        match err {
            DetectionError::Unavailable(msg) => AppError::DetectionUnavailable(msg),
            DetectionError::BadResult(msg) => AppError::DetectionBadResult(msg),
            DetectionError::NotFound(key) => {
                AppError::NotFound(format!("image file not found ({})", key))
            }
        }
    }
}
