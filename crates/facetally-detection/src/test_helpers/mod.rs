//! In-process detectors for tests.
//!
//! Every detector hands out a [`DetectorProbe`] before it is boxed, so tests
//! can still read call counts once the gateway owns the detector.

use crate::detector::{DetectionError, Detector};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared counters observed by tests.
#[derive(Debug, Clone, Default)]
pub struct DetectorProbe {
    calls: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
    shutdowns: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl DetectorProbe {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    /// Highest number of detections observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Always reports the same face count.
#[derive(Debug)]
pub struct StaticDetector {
    face_count: u32,
    delay: Option<Duration>,
    probe: DetectorProbe,
}

impl StaticDetector {
    pub fn new(face_count: u32) -> Self {
        Self {
            face_count,
            delay: None,
            probe: DetectorProbe::default(),
        }
    }

    /// Sleep for `delay` inside every detection.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn probe(&self) -> DetectorProbe {
        self.probe.clone()
    }
}

#[async_trait]
impl Detector for StaticDetector {
    fn name(&self) -> &str {
        "static"
    }

    async fn detect(&mut self, _path: &Path) -> Result<u32, DetectionError> {
        self.probe.enter();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.probe.exit();
        Ok(self.face_count)
    }

    async fn shutdown(&mut self) -> Result<(), DetectionError> {
        self.probe.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Replays a fixed list of outcomes, then reports `Unavailable`.
#[derive(Debug)]
pub struct ScriptedDetector {
    outcomes: VecDeque<Result<u32, DetectionError>>,
    probe: DetectorProbe,
}

impl ScriptedDetector {
    pub fn new(outcomes: Vec<Result<u32, DetectionError>>) -> Self {
        Self {
            outcomes: outcomes.into(),
            probe: DetectorProbe::default(),
        }
    }

    /// A detector whose every call fails with `error`.
    pub fn failing(error: DetectionError) -> Self {
        Self::new(vec![Err(error); 64])
    }

    pub fn probe(&self) -> DetectorProbe {
        self.probe.clone()
    }
}

#[async_trait]
impl Detector for ScriptedDetector {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn detect(&mut self, _path: &Path) -> Result<u32, DetectionError> {
        self.probe.enter();
        let outcome = self
            .outcomes
            .pop_front()
            .unwrap_or_else(|| Err(DetectionError::Unavailable("script exhausted".to_string())));
        self.probe.exit();
        outcome
    }

    async fn shutdown(&mut self) -> Result<(), DetectionError> {
        self.probe.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
