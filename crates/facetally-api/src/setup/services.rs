//! Service initialization

use anyhow::{Context, Result};
use facetally_core::{Clock, Config, SystemClock};
use facetally_detection::{Detector, DetectorGateway, SubprocessDetector};
use facetally_storage::Storage;
use std::sync::Arc;

use crate::services::lifecycle::ImageLifecycle;
use crate::state::AppState;
use crate::utils::access_token::AccessTokenCodec;

/// Start the configured detector process and build the application state.
///
/// A detector that cannot be started is fatal.
pub async fn initialize_services(
    config: &Config,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    tracing::info!(command = %config.detector_command().join(" "), "Starting face detector...");
    let detector = SubprocessDetector::spawn(config.detector_command(), config.detector_workdir())
        .context("Failed to start face detector")?;

    build_state(config, storage, Box::new(detector), Arc::new(SystemClock))
}

/// Assemble the application state around an already running detector.
pub fn build_state(
    config: &Config,
    storage: Arc<dyn Storage>,
    detector: Box<dyn Detector>,
    clock: Arc<dyn Clock>,
) -> Result<Arc<AppState>> {
    let codec = AccessTokenCodec::from_secret(config.token_secret())?;
    let gateway = DetectorGateway::new(detector, storage.clone());
    let lifecycle = ImageLifecycle::new(gateway, codec, clock, config.public_base_url());

    Ok(Arc::new(AppState {
        config: config.clone(),
        lifecycle: Arc::new(lifecycle),
        storage,
    }))
}
