//! Container and blob operations spanning the metadata store and blob storage.
//!
//! Containers live in two places at once: a record in the metadata store and a
//! physical container in blob storage. Blobs live only in blob storage, keyed
//! by their ID with the display name attached as object metadata. This module
//! owns the rules for keeping the two sides coherent.

use crate::db::handlers::blob_storage::{BlobStorage, ObjectEntry};
use crate::db::handlers::containers::ContainerStore;
use crate::db::models::blobs::{Blob, BlobEntry};
use crate::db::models::containers::{Container, ContainerCreateDBRequest};
use crate::errors::{Error, Result};
use crate::types::{ContainerId, abbrev_uuid};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Object metadata key carrying the user-facing blob name
const METADATA_NAME_KEY: &str = "name";

/// Service for container and blob operations
#[derive(Clone)]
pub struct BlobRepository {
    containers: Arc<dyn ContainerStore>,
    storage: Arc<dyn BlobStorage>,
}

impl BlobRepository {
    pub fn new(containers: Arc<dyn ContainerStore>, storage: Arc<dyn BlobStorage>) -> Self {
        Self { containers, storage }
    }

    /// List all containers known to the metadata store
    ///
    /// Does not consult blob storage, so records created while the physical
    /// side failed still show up here.
    #[instrument(skip(self), err)]
    pub async fn list_containers(&self) -> Result<Vec<Container>> {
        let containers = self.containers.list().await?;
        Ok(containers)
    }

    /// Create a container under a freshly generated ID
    ///
    /// The metadata record is written before the physical container is
    /// created. Returns `None` without touching anything if blob storage
    /// already holds a container under the new ID.
    #[instrument(skip(self), err)]
    pub async fn add_container(&self, name: &str) -> Result<Option<Container>> {
        let container_id = Uuid::new_v4();

        if self.storage.container_exists(container_id).await? {
            tracing::warn!("generated ID {} collides with an existing physical container, skipping creation", container_id);
            return Ok(None);
        }

        let record = self
            .containers
            .create(&ContainerCreateDBRequest {
                id: container_id,
                name: name.to_string(),
            })
            .await?;
        self.storage.create_container(container_id).await?;

        Ok(Some(record))
    }

    /// List the blobs in a container
    ///
    /// Returns `None` if the physical container does not exist; an existing
    /// container with no blobs yields `Some` of an empty list. Listing pages
    /// are flattened in store order.
    #[instrument(skip(self), fields(container_id = %abbrev_uuid(&container_id)), err)]
    pub async fn list_blobs(&self, container_id: ContainerId) -> Result<Option<Vec<BlobEntry>>> {
        if !self.storage.container_exists(container_id).await? {
            return Ok(None);
        }

        let mut entries = Vec::new();
        let mut continuation = None;
        loop {
            let page = self.storage.list_objects(container_id, continuation).await?;
            for object in page.entries {
                entries.push(parse_entry(container_id, object)?);
            }
            match page.continuation {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        Ok(Some(entries))
    }

    /// Download every blob in a container
    ///
    /// Returns `None` if the physical container does not exist. Downloads run
    /// one at a time in listing order, and the first failure fails the whole
    /// operation.
    #[instrument(skip(self), fields(container_id = %abbrev_uuid(&container_id)), err)]
    pub async fn get_blobs(&self, container_id: ContainerId) -> Result<Option<Vec<Blob>>> {
        let Some(entries) = self.list_blobs(container_id).await? else {
            return Ok(None);
        };

        let mut blobs = Vec::with_capacity(entries.len());
        for entry in entries {
            let content = self.storage.get_object(container_id, &entry.id.to_string()).await?;
            blobs.push(Blob { entry, content });
        }

        Ok(Some(blobs))
    }

    /// Upload a blob into a container under a freshly generated ID
    #[instrument(skip(self, content), fields(container_id = %abbrev_uuid(&container_id), name = %name, size = content.len()), err)]
    pub async fn add_blob(&self, container_id: ContainerId, name: &str, content: Vec<u8>) -> Result<BlobEntry> {
        if !self.storage.container_exists(container_id).await? {
            return Err(Error::NotFound {
                resource: "Container".to_string(),
                id: container_id.to_string(),
            });
        }

        let blob_id = Uuid::new_v4();
        let metadata = HashMap::from([(METADATA_NAME_KEY.to_string(), name.to_string())]);
        self.storage.put_object(container_id, &blob_id.to_string(), content, metadata).await?;

        Ok(BlobEntry {
            id: blob_id,
            name: name.to_string(),
            container_id,
        })
    }
}

/// Turn a raw listing entry into a blob entry
///
/// The object key must parse as a blob ID and the name metadata must be
/// present; both failures propagate rather than being skipped.
fn parse_entry(container_id: ContainerId, object: ObjectEntry) -> Result<BlobEntry> {
    let id = Uuid::parse_str(&object.key).map_err(|e| {
        anyhow::anyhow!(
            "object key {:?} in container {} is not a valid blob ID: {}",
            object.key,
            container_id,
            e
        )
    })?;

    let name = object
        .metadata
        .get(METADATA_NAME_KEY)
        .ok_or_else(|| anyhow::anyhow!("object {} in container {} has no name metadata", object.key, container_id))?
        .clone();

    Ok(BlobEntry {
        id,
        name,
        container_id,
    })
}
