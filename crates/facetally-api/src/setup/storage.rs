//! Storage setup and initialization

use anyhow::Result;
use facetally_core::Config;
use facetally_storage::{create_storage, Storage};
use std::sync::Arc;

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    tracing::info!("Initializing storage...");
    let storage = create_storage(config).await?;
    tracing::info!(
        upload_dir = %config.upload_dir().display(),
        "Storage initialized successfully"
    );
    Ok(storage)
}
