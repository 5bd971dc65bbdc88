//! Facetally Storage Library
//!
//! This crate provides the storage abstraction for uploaded images and its
//! local filesystem implementation.
//!
//! # Storage key format
//!
//! Keys are flat file names: `{uuid}{extension}` (for example
//! `0b6f...c1.png`). Keys never contain path separators or `..`; key
//! generation and validation are centralized in the `keys` module.

pub mod factory;
pub mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use local::LocalStorage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
