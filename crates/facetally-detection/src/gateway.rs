//! Serialized access to the process-wide detector.

use crate::detector::{DetectionError, Detector};
use facetally_storage::{Storage, StorageError};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Owns the single detector handle for the lifetime of the process.
///
/// At most one detection runs at a time, whatever image it is for. Calls are
/// dispatched onto their own task so a caller that goes away does not abort a
/// detection already in progress.
#[derive(Clone)]
pub struct DetectorGateway {
    detector: Arc<Mutex<Option<Box<dyn Detector>>>>,
    storage: Arc<dyn Storage>,
}

impl DetectorGateway {
    pub fn new(detector: Box<dyn Detector>, storage: Arc<dyn Storage>) -> Self {
        tracing::info!(detector = detector.name(), "Face detector ready");
        Self {
            detector: Arc::new(Mutex::new(Some(detector))),
            storage,
        }
    }

    /// Count faces in the image stored under `storage_key`.
    #[tracing::instrument(skip(self), fields(operation = "detect_faces"))]
    pub async fn detect(&self, storage_key: &str) -> Result<u32, DetectionError> {
        let path = self.storage.local_path(storage_key).map_err(|e| match e {
            StorageError::InvalidKey(_) | StorageError::NotFound(_) => {
                DetectionError::NotFound(storage_key.to_string())
            }
            other => DetectionError::Unavailable(other.to_string()),
        })?;

        let exists = self
            .storage
            .exists(storage_key)
            .await
            .map_err(|e| DetectionError::Unavailable(e.to_string()))?;
        if !exists {
            return Err(DetectionError::NotFound(storage_key.to_string()));
        }

        let mut guard = self.detector.clone().lock_owned().await;
        let key = storage_key.to_string();

        let handle = tokio::spawn(async move {
            let detector = guard.as_mut().ok_or_else(|| {
                DetectionError::Unavailable("detector has been shut down".to_string())
            })?;

            let start = Instant::now();
            let result = detector.detect(&path).await;
            let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

            match &result {
                Ok(count) => tracing::info!(
                    key = %key,
                    face_count = count,
                    duration_ms = duration_ms,
                    "Face detection completed"
                ),
                Err(e) => tracing::warn!(
                    key = %key,
                    error = %e,
                    duration_ms = duration_ms,
                    "Face detection failed"
                ),
            }

            result
        });

        handle
            .await
            .map_err(|e| DetectionError::Unavailable(format!("detection task failed: {}", e)))?
    }

    /// Tear the detector down. Only the first call reaches the detector.
    pub async fn shutdown(&self) -> Result<(), DetectionError> {
        let detector = self.detector.lock().await.take();
        match detector {
            Some(mut detector) => {
                tracing::info!(detector = detector.name(), "Shutting down face detector");
                detector.shutdown().await
            }
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for DetectorGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorGateway").finish_non_exhaustive()
    }
}
