//! Database repository for containers.

use crate::db::{
    errors::{DbError, Result},
    models::containers::{Container, ContainerCreateDBRequest},
};
use crate::types::abbrev_uuid;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::instrument;

/// Trait for container metadata stores
#[async_trait]
pub trait ContainerStore: Send + Sync {
    /// List all known containers in insertion order
    async fn list(&self) -> Result<Vec<Container>>;

    /// Record a new container
    async fn create(&self, request: &ContainerCreateDBRequest) -> Result<Container>;
}

// ============================================================================
// PostgreSQL Implementation
// ============================================================================

/// PostgreSQL-backed container store
pub struct PgContainers {
    pool: PgPool,
}

impl PgContainers {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContainerStore for PgContainers {
    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<Container>> {
        let containers = sqlx::query_as::<_, Container>("SELECT id, name, created_at FROM containers ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await?;

        Ok(containers)
    }

    #[instrument(skip(self, request), fields(container_id = %abbrev_uuid(&request.id), name = %request.name), err)]
    async fn create(&self, request: &ContainerCreateDBRequest) -> Result<Container> {
        let container =
            sqlx::query_as::<_, Container>("INSERT INTO containers (id, name) VALUES ($1, $2) RETURNING id, name, created_at")
                .bind(request.id)
                .bind(&request.name)
                .fetch_one(&self.pool)
                .await?;

        Ok(container)
    }
}

// ============================================================================
// In-Memory Implementation
// ============================================================================

/// In-memory container store
/// Useful for development and testing
#[derive(Default)]
pub struct InMemoryContainers {
    containers: RwLock<Vec<Container>>,
}

impl InMemoryContainers {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContainerStore for InMemoryContainers {
    async fn list(&self) -> Result<Vec<Container>> {
        Ok(self.containers.read().await.clone())
    }

    async fn create(&self, request: &ContainerCreateDBRequest) -> Result<Container> {
        let mut containers = self.containers.write().await;

        if containers.iter().any(|c| c.id == request.id) {
            return Err(DbError::UniqueViolation {
                constraint: Some("containers_pkey".to_string()),
                table: Some("containers".to_string()),
                message: format!("duplicate container id {}", request.id),
            });
        }

        let container = Container {
            id: request.id,
            name: request.name.clone(),
            created_at: Utc::now(),
        };
        containers.push(container.clone());

        Ok(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_list_empty_store() {
        let store = InMemoryContainers::new();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_and_list_preserves_insertion_order() {
        let store = InMemoryContainers::new();

        let mut ids = Vec::new();
        for name in ["alpha", "beta", "gamma"] {
            let created = store
                .create(&ContainerCreateDBRequest {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                })
                .await
                .unwrap();
            assert_eq!(created.name, name);
            ids.push(created.id);
        }

        let listed = store.list().await.unwrap();
        assert_eq!(listed.iter().map(|c| c.id).collect::<Vec<_>>(), ids);
        assert_eq!(listed.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(), vec!["alpha", "beta", "gamma"]);
    }

    #[tokio::test]
    async fn test_create_duplicate_id_is_unique_violation() {
        let store = InMemoryContainers::new();
        let id = Uuid::new_v4();

        store
            .create(&ContainerCreateDBRequest {
                id,
                name: "Docs".to_string(),
            })
            .await
            .unwrap();

        let err = store
            .create(&ContainerCreateDBRequest {
                id,
                name: "Docs again".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
