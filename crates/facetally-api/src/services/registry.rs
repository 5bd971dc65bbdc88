//! In-memory registry of uploaded images.
//!
//! The map itself is only locked for lookups and inserts. Each record owns its
//! detection lock and a write-once outcome, so work on one image never blocks
//! another and the first recorded face count is the only one ever observed.

use chrono::{DateTime, Utc};
use facetally_core::models::{ImageMetadata, ImageRecord, ImageState};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
struct DetectionOutcome {
    face_count: u32,
    processed_at: DateTime<Utc>,
}

#[derive(Debug)]
struct RecordSlot {
    storage_key: String,
    metadata: ImageMetadata,
    created_at: DateTime<Utc>,
    outcome: OnceLock<DetectionOutcome>,
    detection_lock: Arc<tokio::sync::Mutex<()>>,
}

impl RecordSlot {
    fn snapshot(&self, id: Uuid) -> ImageRecord {
        let outcome = self.outcome.get().copied();
        let state = match outcome {
            Some(_) => ImageState::Processed,
            None if self.detection_lock.try_lock().is_err() => ImageState::Detecting,
            None => ImageState::Uploaded,
        };

        ImageRecord {
            id,
            storage_key: self.storage_key.clone(),
            state,
            face_count: outcome.map(|o| o.face_count),
            metadata: self.metadata.clone(),
            created_at: self.created_at,
            processed_at: outcome.map(|o| o.processed_at),
        }
    }
}

#[derive(Debug, Default)]
pub struct ImageRegistry {
    records: RwLock<HashMap<Uuid, Arc<RecordSlot>>>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: Uuid) -> Option<Arc<RecordSlot>> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Insert a new `Uploaded` record and return its id.
    pub fn create(
        &self,
        storage_key: String,
        metadata: ImageMetadata,
        created_at: DateTime<Utc>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let slot = Arc::new(RecordSlot {
            storage_key,
            metadata,
            created_at,
            outcome: OnceLock::new(),
            detection_lock: Arc::new(tokio::sync::Mutex::new(())),
        });

        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, slot);
        id
    }

    /// Snapshot of the record, or `None` for an unknown id.
    pub fn get(&self, id: Uuid) -> Option<ImageRecord> {
        self.slot(id).map(|slot| slot.snapshot(id))
    }

    /// Record the face count. The first call wins; later calls leave the
    /// record untouched. Returns the count now stored, or `None` for an
    /// unknown id.
    pub fn mark_processed(
        &self,
        id: Uuid,
        face_count: u32,
        processed_at: DateTime<Utc>,
    ) -> Option<u32> {
        let slot = self.slot(id)?;
        let outcome = slot.outcome.get_or_init(|| DetectionOutcome {
            face_count,
            processed_at,
        });
        if outcome.face_count != face_count {
            tracing::warn!(
                image_id = %id,
                recorded = outcome.face_count,
                discarded = face_count,
                "Image already processed, keeping first face count"
            );
        }
        Some(outcome.face_count)
    }

    /// Lock serializing detection for one image.
    pub fn detection_lock(&self, id: Uuid) -> Option<Arc<tokio::sync::Mutex<()>>> {
        self.slot(id).map(|slot| slot.detection_lock.clone())
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
