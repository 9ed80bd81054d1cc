use crate::types::{BlobId, ContainerId};

/// A blob as it appears in a container listing
///
/// Assembled from object storage listings rather than database rows: the
/// object key is the blob ID and the user-facing name travels as object
/// metadata alongside the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEntry {
    pub id: BlobId,
    pub name: String,
    pub container_id: ContainerId,
}

/// A blob listing entry together with its content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub entry: BlobEntry,
    pub content: Vec<u8>,
}
