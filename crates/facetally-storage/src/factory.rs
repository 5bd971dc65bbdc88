use crate::{LocalStorage, Storage, StorageResult};
use facetally_core::Config;
use std::sync::Arc;

/// Create the storage backend described by the configuration.
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let storage = LocalStorage::new(config.upload_dir()).await?;
    tracing::info!(path = %config.upload_dir().display(), "Using local storage backend");
    Ok(Arc::new(storage))
}
