//! Application state shared by every handler.

use facetally_core::Config;
use facetally_storage::Storage;
use std::sync::Arc;

use crate::services::lifecycle::ImageLifecycle;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub lifecycle: Arc<ImageLifecycle>,
    pub storage: Arc<dyn Storage>,
}
