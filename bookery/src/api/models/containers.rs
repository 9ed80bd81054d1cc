//! API request/response models for containers.

use crate::db::models::containers::Container;
use crate::types::ContainerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContainerCreate {
    /// Human-readable container name; the identifier is generated server-side
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContainerResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ContainerId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<Container> for ContainerResponse {
    fn from(container: Container) -> Self {
        Self {
            id: container.id,
            name: container.name,
            created_at: container.created_at,
        }
    }
}
