//! HTTP response bodies.
//!
//! Every body carries `code` (mirrors the HTTP status) and a human readable
//! `message`, followed by the endpoint-specific payload.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GeneralResponse {
    pub code: u16,
    pub message: String,
}

impl GeneralResponse {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(200, message)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    #[serde(flatten)]
    pub general: GeneralResponse,
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckResponse {
    #[serde(flatten)]
    pub general: GeneralResponse,
    pub face_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResultResponse {
    #[serde(flatten)]
    pub general: GeneralResponse,
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub images: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_response_shape() {
        let response = CheckResponse {
            general: GeneralResponse::ok("image id found"),
            face_count: 2,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["code"], 200);
        assert_eq!(json["message"], "image id found");
        assert_eq!(json["face_count"], 2);
        assert!(json.get("general").is_none());
    }
}
