//! Image lifecycle: ingest, detect once, publish a signed link, gate access.

use chrono::Duration;
use facetally_core::constants::ACCESS_TOKEN_QUERY_PARAM;
use facetally_core::models::ImageMetadata;
use facetally_core::{AppError, Clock};
use facetally_detection::{DetectionError, DetectorGateway};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::services::registry::ImageRegistry;
use crate::utils::access_token::{AccessTokenCodec, TokenError};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("image {0} not found")]
    NotFound(Uuid),

    #[error("invalid access token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("access link expired at {expired_at}")]
    Expired { expired_at: i64 },

    #[error(transparent)]
    Detection(#[from] DetectionError),
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotFound(_) => AppError::NotFound("image id not exist".to_string()),
            LifecycleError::InvalidToken(e) => {
                AppError::InvalidToken(format!("invalid image url: {}", e))
            }
            LifecycleError::Expired { expired_at } => AppError::Expired { expired_at },
            LifecycleError::Detection(e) => e.into(),
        }
    }
}

/// A published, time-limited image link.
#[derive(Debug, Clone)]
pub struct AccessLink {
    pub url: String,
    pub token: String,
    /// Epoch seconds
    pub expires_at: i64,
}

/// What the file-serving step needs once access has been granted.
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub storage_key: String,
    pub content_type: String,
}

pub struct ImageLifecycle {
    registry: Arc<ImageRegistry>,
    detector: DetectorGateway,
    codec: AccessTokenCodec,
    clock: Arc<dyn Clock>,
    public_base_url: String,
}

impl ImageLifecycle {
    pub fn new(
        detector: DetectorGateway,
        codec: AccessTokenCodec,
        clock: Arc<dyn Clock>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            registry: Arc::new(ImageRegistry::new()),
            detector,
            codec,
            clock,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn registry(&self) -> &ImageRegistry {
        &self.registry
    }

    /// Register a stored file. The record starts out `Uploaded`.
    pub fn ingest(&self, storage_key: String, metadata: ImageMetadata) -> Uuid {
        let id = self
            .registry
            .create(storage_key, metadata, self.clock.now());
        tracing::info!(image_id = %id, "Image registered");
        id
    }

    /// Return the face count, running detection if it has not succeeded yet.
    ///
    /// Callers racing on the same image queue on its detection lock; the
    /// first to get it runs the detector and the rest read the stored count.
    /// The lock, the detector call and the state transition run on their own
    /// task, so a caller that goes away does not lose a finished detection.
    /// A failed detection leaves the image `Uploaded` so the next call retries.
    #[tracing::instrument(skip(self), fields(operation = "ensure_processed"))]
    pub async fn ensure_processed(&self, id: Uuid) -> Result<u32, LifecycleError> {
        let record = self.registry.get(id).ok_or(LifecycleError::NotFound(id))?;
        if let Some(face_count) = record.face_count {
            return Ok(face_count);
        }

        let lock = self
            .registry
            .detection_lock(id)
            .ok_or(LifecycleError::NotFound(id))?;
        let registry = self.registry.clone();
        let detector = self.detector.clone();
        let clock = self.clock.clone();
        let storage_key = record.storage_key;

        let handle = tokio::spawn(
            async move {
                let _guard = lock.lock_owned().await;

                if let Some(face_count) = registry.get(id).and_then(|r| r.face_count) {
                    tracing::debug!(image_id = %id, "Detection finished while waiting");
                    return Ok::<u32, LifecycleError>(face_count);
                }

                let face_count = detector.detect(&storage_key).await?;

                registry
                    .mark_processed(id, face_count, clock.now())
                    .ok_or(LifecycleError::NotFound(id))
            }
            .in_current_span(),
        );

        handle.await.map_err(|e| {
            LifecycleError::Detection(DetectionError::Unavailable(format!(
                "detection task failed: {}",
                e
            )))
        })?
    }

    /// Mint a signed link to the original image, valid for `ttl`.
    ///
    /// Detection is attempted first, but only an unknown id stops the link
    /// from being issued: the link serves the original file, not the count.
    #[tracing::instrument(skip(self), fields(operation = "issue_access_link"))]
    pub async fn issue_access_link(
        &self,
        id: Uuid,
        ttl: Duration,
    ) -> Result<AccessLink, LifecycleError> {
        match self.ensure_processed(id).await {
            Ok(_) => {}
            Err(LifecycleError::NotFound(id)) => return Err(LifecycleError::NotFound(id)),
            Err(e) => {
                tracing::warn!(image_id = %id, error = %e, "Issuing link without face count");
            }
        }

        let expires_at = self
            .clock
            .now_epoch_secs()
            .saturating_add(ttl.num_seconds());
        let token = self.codec.encode(id, expires_at);
        let url = format!(
            "{}/image/{}?{}={}",
            self.public_base_url, id, ACCESS_TOKEN_QUERY_PARAM, token
        );

        Ok(AccessLink {
            url,
            token,
            expires_at,
        })
    }

    /// Check a token presented for image `id`. The link is valid up to and
    /// including its expiry second.
    pub fn resolve_access(&self, id: Uuid, token: &str) -> Result<ResolvedImage, LifecycleError> {
        let claims = self.codec.decode(token)?;

        if self.clock.now_epoch_secs() > claims.expires_at {
            return Err(LifecycleError::Expired {
                expired_at: claims.expires_at,
            });
        }

        if claims.image_id != id {
            tracing::debug!(image_id = %id, token_image_id = %claims.image_id, "Token issued for another image");
            return Err(LifecycleError::NotFound(id));
        }

        let record = self.registry.get(id).ok_or(LifecycleError::NotFound(id))?;
        Ok(ResolvedImage {
            content_type: record.content_type().to_string(),
            storage_key: record.storage_key,
        })
    }

    /// Shut the detector down. Safe to call more than once.
    pub async fn shutdown(&self) {
        if let Err(e) = self.detector.shutdown().await {
            tracing::error!(error = %e, "Detector shutdown failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facetally_core::models::ImageState;
    use facetally_core::ManualClock;
    use facetally_detection::test_helpers::{DetectorProbe, ScriptedDetector, StaticDetector};
    use facetally_detection::Detector;
    use facetally_storage::{LocalStorage, Storage};
    use tempfile::TempDir;

    const START: i64 = 1_700_000_000;

    struct Harness {
        lifecycle: Arc<ImageLifecycle>,
        clock: Arc<ManualClock>,
        storage: Arc<dyn Storage>,
        _dir: TempDir,
    }

    impl Harness {
        async fn new(detector: Box<dyn Detector>) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
            let clock = Arc::new(ManualClock::at_epoch_secs(START));
            let codec = AccessTokenCodec::new(b"0123456789abcdef0123456789abcdef").unwrap();
            let lifecycle = ImageLifecycle::new(
                DetectorGateway::new(detector, storage.clone()),
                codec,
                clock.clone(),
                "http://localhost:8000/",
            );
            Self {
                lifecycle: Arc::new(lifecycle),
                clock,
                storage,
                _dir: dir,
            }
        }

        async fn ingest(&self) -> Uuid {
            let key = self
                .storage
                .upload("png", "image/png", vec![0x89, b'P', b'N', b'G'])
                .await
                .unwrap();
            self.lifecycle.ingest(
                key,
                ImageMetadata {
                    original_filename: "face.png".to_string(),
                    content_type: "image/png".to_string(),
                    file_size: 4,
                },
            )
        }
    }

    fn static_detector(count: u32) -> (Box<dyn Detector>, DetectorProbe) {
        let detector = StaticDetector::new(count);
        let probe = detector.probe();
        (Box::new(detector), probe)
    }

    #[tokio::test]
    async fn test_detection_runs_once() {
        let (detector, probe) = static_detector(2);
        let h = Harness::new(detector).await;
        let id = h.ingest().await;

        for _ in 0..5 {
            assert_eq!(h.lifecycle.ensure_processed(id).await.unwrap(), 2);
        }
        assert_eq!(probe.calls(), 1);
        assert_eq!(
            h.lifecycle.registry().get(id).unwrap().state,
            ImageState::Processed
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_detection() {
        let detector = StaticDetector::new(3).with_delay(std::time::Duration::from_millis(50));
        let probe = detector.probe();
        let h = Harness::new(Box::new(detector)).await;
        let id = h.ingest().await;

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let lifecycle = h.lifecycle.clone();
                tokio::spawn(async move { lifecycle.ensure_processed(id).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 3);
        }
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let (detector, probe) = static_detector(1);
        let h = Harness::new(detector).await;

        let result = h.lifecycle.ensure_processed(Uuid::new_v4()).await;
        assert!(matches!(result, Err(LifecycleError::NotFound(_))));

        let result = h
            .lifecycle
            .issue_access_link(Uuid::new_v4(), Duration::minutes(15))
            .await;
        assert!(matches!(result, Err(LifecycleError::NotFound(_))));
        assert_eq!(probe.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_detection_is_retried() {
        let detector = ScriptedDetector::new(vec![
            Err(DetectionError::Unavailable("warming up".into())),
            Ok(4),
        ]);
        let probe = detector.probe();
        let h = Harness::new(Box::new(detector)).await;
        let id = h.ingest().await;

        let first = h.lifecycle.ensure_processed(id).await;
        assert!(matches!(
            first,
            Err(LifecycleError::Detection(DetectionError::Unavailable(_)))
        ));
        let record = h.lifecycle.registry().get(id).unwrap();
        assert_eq!(record.state, ImageState::Uploaded);
        assert!(record.face_count.is_none());

        assert_eq!(h.lifecycle.ensure_processed(id).await.unwrap(), 4);
        assert_eq!(h.lifecycle.ensure_processed(id).await.unwrap(), 4);
        assert_eq!(probe.calls(), 2);
    }

    #[tokio::test]
    async fn test_link_issued_even_when_detection_fails() {
        let detector = ScriptedDetector::failing(DetectionError::BadResult("nan".into()));
        let h = Harness::new(Box::new(detector)).await;
        let id = h.ingest().await;

        let link = h
            .lifecycle
            .issue_access_link(id, Duration::minutes(15))
            .await
            .unwrap();
        assert_eq!(link.expires_at, START + 15 * 60);
        assert_eq!(
            link.url,
            format!("http://localhost:8000/image/{}?expired={}", id, link.token)
        );
        assert!(h.lifecycle.resolve_access(id, &link.token).is_ok());
    }

    #[tokio::test]
    async fn test_expiry_boundary() {
        let (detector, _probe) = static_detector(1);
        let h = Harness::new(detector).await;
        let id = h.ingest().await;

        let link = h
            .lifecycle
            .issue_access_link(id, Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(link.expires_at, START + 60);

        h.clock.advance(Duration::seconds(59));
        let resolved = h.lifecycle.resolve_access(id, &link.token).unwrap();
        assert_eq!(resolved.content_type, "image/png");
        assert!(resolved.storage_key.ends_with(".png"));

        h.clock.advance(Duration::seconds(1));
        assert!(h.lifecycle.resolve_access(id, &link.token).is_ok());

        h.clock.advance(Duration::seconds(1));
        let result = h.lifecycle.resolve_access(id, &link.token);
        assert!(matches!(
            result,
            Err(LifecycleError::Expired { expired_at }) if expired_at == START + 60
        ));
    }

    #[tokio::test]
    async fn test_token_for_other_image_is_not_found() {
        let (detector, _probe) = static_detector(1);
        let h = Harness::new(detector).await;
        let a = h.ingest().await;
        let b = h.ingest().await;

        let link = h
            .lifecycle
            .issue_access_link(a, Duration::minutes(5))
            .await
            .unwrap();
        let result = h.lifecycle.resolve_access(b, &link.token);
        assert!(matches!(result, Err(LifecycleError::NotFound(id)) if id == b));
    }

    #[tokio::test]
    async fn test_malformed_token_is_invalid() {
        let (detector, _probe) = static_detector(1);
        let h = Harness::new(detector).await;
        let id = h.ingest().await;

        let result = h.lifecycle.resolve_access(id, "1700000900");
        assert!(matches!(result, Err(LifecycleError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_links_carry_independent_expiries() {
        let (detector, _probe) = static_detector(1);
        let h = Harness::new(detector).await;
        let id = h.ingest().await;

        let short = h
            .lifecycle
            .issue_access_link(id, Duration::minutes(1))
            .await
            .unwrap();
        h.clock.advance(Duration::seconds(30));
        let long = h
            .lifecycle
            .issue_access_link(id, Duration::minutes(1))
            .await
            .unwrap();
        assert_ne!(short.token, long.token);

        h.clock.advance(Duration::seconds(45));
        assert!(h.lifecycle.resolve_access(id, &short.token).is_err());
        assert!(h.lifecycle.resolve_access(id, &long.token).is_ok());
    }

    #[tokio::test]
    async fn test_dropped_caller_keeps_finished_detection() {
        let detector = StaticDetector::new(2).with_delay(std::time::Duration::from_millis(100));
        let probe = detector.probe();
        let h = Harness::new(Box::new(detector)).await;
        let id = h.ingest().await;

        let abandoned = tokio::time::timeout(
            std::time::Duration::from_millis(10),
            h.lifecycle.ensure_processed(id),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        assert_eq!(probe.completed(), 1);
        let record = h.lifecycle.registry().get(id).unwrap();
        assert_eq!(record.state, ImageState::Processed);
        assert_eq!(record.face_count, Some(2));

        assert_eq!(h.lifecycle.ensure_processed(id).await.unwrap(), 2);
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test]
    async fn test_oversized_ttl_does_not_overflow() {
        let (detector, _probe) = static_detector(1);
        let h = Harness::new(detector).await;
        let id = h.ingest().await;

        let link = h
            .lifecycle
            .issue_access_link(id, Duration::seconds(i64::MAX / 1000))
            .await
            .unwrap();
        assert!(link.expires_at > START);
        assert!(h.lifecycle.resolve_access(id, &link.token).is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let (detector, probe) = static_detector(1);
        let h = Harness::new(detector).await;

        h.lifecycle.shutdown().await;
        h.lifecycle.shutdown().await;
        assert_eq!(probe.shutdowns(), 1);
    }

    #[test]
    fn test_error_mapping() {
        use facetally_core::ErrorMetadata;

        let err: AppError = LifecycleError::NotFound(Uuid::new_v4()).into();
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.client_message(), "image id not exist");

        let err: AppError = LifecycleError::Expired { expired_at: 1 }.into();
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.client_message(), "url expired");

        let err: AppError = LifecycleError::InvalidToken(TokenError::Signature).into();
        assert_eq!(err.http_status_code(), 400);
    }
}
