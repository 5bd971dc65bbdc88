//! Facetally API Library
//!
//! This crate provides the HTTP handlers, the image lifecycle services and the
//! application setup.

// Module declarations
mod api_doc;
pub mod constants;
mod handlers;
mod middleware;
pub mod services;
pub mod setup;
mod telemetry;
pub mod utils;

// Public modules
pub mod error;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use services::lifecycle::{AccessLink, ImageLifecycle, LifecycleError, ResolvedImage};
pub use services::registry::ImageRegistry;
pub use state::AppState;
