//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p facetally-api --test images_test`.
//! The router is the production one; only the detector and the clock are
//! replaced by in-process doubles.

#![allow(dead_code)]

pub mod fixtures;

use axum_test::TestServer;
use chrono::Duration;
use facetally_api::setup::{routes, services};
use facetally_core::{BaseConfig, Config, ImageServiceConfig, ManualClock};
use facetally_detection::test_helpers::{DetectorProbe, StaticDetector};
use facetally_detection::Detector;
use facetally_storage::{LocalStorage, Storage};
use std::sync::Arc;
use tempfile::TempDir;

pub const PUBLIC_BASE_URL: &str = "http://facetally.test";
pub const START_EPOCH_SECS: i64 = 1_700_000_000;
pub const TEST_TOKEN_SECRET: &str = "test-secret-test-secret-test-secret";

/// Test application: server, controllable clock and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub clock: Arc<ManualClock>,
    pub storage: Arc<dyn Storage>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn advance_clock(&self, by: Duration) {
        self.clock.advance(by);
    }
}

pub fn create_test_config(upload_dir: &std::path::Path, url_expiry_minutes: u64) -> Config {
    Config(Box::new(ImageServiceConfig {
        base: BaseConfig {
            server_port: 8000,
            environment: "test".to_string(),
            cors_origins: vec!["*".to_string()],
            http_concurrency_limit: 100,
            log_format: "compact".to_string(),
        },
        public_base_url: PUBLIC_BASE_URL.to_string(),
        url_expiry_minutes,
        upload_dir: upload_dir.to_path_buf(),
        max_file_size_bytes: 1024 * 1024,
        allowed_content_types: vec!["image/jpeg".to_string(), "image/png".to_string()],
        token_secret: Some(TEST_TOKEN_SECRET.to_string()),
        detector_command: vec!["unused".to_string()],
        detector_workdir: None,
    }))
}

/// Setup test app with a detector that always reports `face_count` faces.
pub async fn setup_test_app(face_count: u32) -> (TestApp, DetectorProbe) {
    let detector = StaticDetector::new(face_count);
    let probe = detector.probe();
    let app = setup_test_app_with(Box::new(detector), 15).await;
    (app, probe)
}

/// Setup test app with the given detector and link lifetime.
pub async fn setup_test_app_with(detector: Box<dyn Detector>, url_expiry_minutes: u64) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(temp_dir.path())
            .await
            .expect("Failed to create local storage"),
    );

    let config = create_test_config(temp_dir.path(), url_expiry_minutes);
    config.validate().expect("Test config must be valid");

    let clock = Arc::new(ManualClock::at_epoch_secs(START_EPOCH_SECS));
    let state = services::build_state(&config, storage.clone(), detector, clock.clone())
        .expect("Failed to build state");
    let app = routes::setup_routes(&config, state).expect("Failed to build routes");

    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        clock,
        storage,
        _temp_dir: temp_dir,
    }
}

/// Path and query of a published image link, relative to the server root.
pub fn link_path(image_url: &str) -> &str {
    image_url
        .strip_prefix(PUBLIC_BASE_URL)
        .expect("image url must start with the public base url")
}

/// Token carried in a published image link.
pub fn link_token(image_url: &str) -> &str {
    image_url
        .split_once("?expired=")
        .map(|(_, token)| token)
        .expect("image url must carry a token")
}
