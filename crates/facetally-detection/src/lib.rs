//! Facetally Detection Library
//!
//! Face counting is delegated to an external detector. This crate defines the
//! [`Detector`] capability, the process-wide [`DetectorGateway`] that
//! serializes every call into it, and the subprocess-backed detector used in
//! production.

pub mod detector;
pub mod gateway;
pub mod subprocess;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use detector::{DetectionError, Detector};
pub use gateway::DetectorGateway;
pub use subprocess::SubprocessDetector;
