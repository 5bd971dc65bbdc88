//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::path::PathBuf;
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Stream of file chunks returned by [`Storage::download_stream`].
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Storage abstraction trait
///
/// The lifecycle core only ever handles storage keys; bytes move through this
/// trait. Keys are flat `{uuid}{extension}` names, see the crate root.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store a new file and return its storage key.
    async fn upload(&self, extension: &str, content_type: &str, data: Vec<u8>)
        -> StorageResult<String>;

    /// Download a file as a stream of chunks.
    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream>;

    /// Check if a file exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Get the size in bytes of a stored file.
    async fn content_length(&self, storage_key: &str) -> StorageResult<u64>;

    /// Resolve a key to a path on the local filesystem.
    ///
    /// The face detector reads files by path, so backends that cannot expose
    /// one return a `ConfigError`.
    fn local_path(&self, storage_key: &str) -> StorageResult<PathBuf>;
}
