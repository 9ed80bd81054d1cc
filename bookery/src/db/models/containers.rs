//! Database models for containers.

use crate::types::ContainerId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database record for a container
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Container {
    pub id: ContainerId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Database request for creating a container record
#[derive(Debug, Clone)]
pub struct ContainerCreateDBRequest {
    pub id: ContainerId,
    pub name: String,
}
