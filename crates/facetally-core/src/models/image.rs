use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle state of an uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageState {
    /// Stored, face count not computed yet.
    Uploaded,
    /// A detection for this image is in flight. Never persisted.
    Detecting,
    /// Face count computed and cached.
    Processed,
}

impl ImageState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageState::Uploaded => "uploaded",
            ImageState::Detecting => "detecting",
            ImageState::Processed => "processed",
        }
    }
}

impl std::fmt::Display for ImageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive data captured at ingest. Immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub original_filename: String,
    pub content_type: String,
    pub file_size: u64,
}

/// Point-in-time snapshot of one image's lifecycle record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: Uuid,
    pub storage_key: String,
    pub state: ImageState,
    /// Present only once `state` is `Processed`.
    pub face_count: Option<u32>,
    pub metadata: ImageMetadata,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl ImageRecord {
    pub fn is_processed(&self) -> bool {
        self.state == ImageState::Processed
    }

    pub fn content_type(&self) -> &str {
        &self.metadata.content_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_state_serializes_lowercase() {
        let json = serde_json::to_string(&ImageState::Processed).unwrap();
        assert_eq!(json, "\"processed\"");
        assert_eq!(ImageState::Detecting.to_string(), "detecting");
    }
}
