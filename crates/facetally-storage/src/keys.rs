//! Shared key generation and validation for storage backends.
//!
//! Key format: `{uuid}{extension}`, where the extension is either empty or a
//! dot followed by 1-10 lowercase ASCII alphanumerics.

use crate::traits::{StorageError, StorageResult};
use uuid::Uuid;

const MAX_EXTENSION_LEN: usize = 10;

/// Normalize a file extension to `.ext` form.
///
/// Accepts `png`, `.png` or `.PNG`. Anything that is not plain ASCII
/// alphanumerics (or is too long) yields an empty extension.
pub fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim().trim_start_matches('.');
    if trimmed.is_empty()
        || trimmed.len() > MAX_EXTENSION_LEN
        || !trimmed.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return String::new();
    }
    format!(".{}", trimmed.to_ascii_lowercase())
}

/// Generate a fresh storage key carrying the given extension.
pub fn generate_storage_key(extension: &str) -> String {
    format!("{}{}", Uuid::new_v4(), normalize_extension(extension))
}

/// Reject keys that could escape the storage root.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if storage_key.contains("..")
        || storage_key.contains('/')
        || storage_key.contains('\\')
        || storage_key.contains('\0')
    {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}
