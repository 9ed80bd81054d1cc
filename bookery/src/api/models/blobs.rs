//! API request/response models for blobs.

use crate::db::models::blobs::{Blob, BlobEntry};
use crate::types::{BlobId, ContainerId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Blob metadata without content, as returned by listings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BlobResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: BlobId,
    pub name: String,
    #[schema(value_type = String, format = "uuid")]
    pub container_id: ContainerId,
}

impl From<BlobEntry> for BlobResponse {
    fn from(entry: BlobEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            container_id: entry.container_id,
        }
    }
}

/// Blob with its content inlined, base64-encoded for JSON transport
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BlobContentResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: BlobId,
    pub name: String,
    #[schema(value_type = String, format = "uuid")]
    pub container_id: ContainerId,
    #[serde(serialize_with = "serialize_content", deserialize_with = "deserialize_content")]
    #[schema(value_type = String, format = "byte")]
    pub content: Vec<u8>,
}

impl From<Blob> for BlobContentResponse {
    fn from(blob: Blob) -> Self {
        Self {
            id: blob.entry.id,
            name: blob.entry.name,
            container_id: blob.entry.container_id,
            content: blob.content,
        }
    }
}

/// Helper to serialize content bytes as base64
fn serialize_content<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use base64::Engine;
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Helper to deserialize content bytes from base64
fn deserialize_content<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use base64::Engine;
    use serde::Deserialize;
    let encoded = String::deserialize(deserializer)?;
    base64::engine::general_purpose::STANDARD
        .decode(&encoded)
        .map_err(|e| serde::de::Error::custom(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_content_round_trips_through_base64_json() {
        let response = BlobContentResponse {
            id: Uuid::new_v4(),
            name: "report.pdf".to_string(),
            container_id: Uuid::new_v4(),
            content: b"%PDF-1.7 report".to_vec(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["content"], "JVBERi0xLjcgcmVwb3J0");

        let parsed: BlobContentResponse = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.content, response.content);
    }
}
