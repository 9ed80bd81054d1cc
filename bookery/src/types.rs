//! Common type definitions.
//!
//! All entity IDs are UUIDs wrapped in type aliases for better type safety:
//!
//! - [`ContainerId`]: Logical container identifier, also the physical
//!   namespace name in the blob store (string form)
//! - [`BlobId`]: Blob identifier, also the object key in the blob store
//! - [`UserId`]: User account identifier
//! - [`RefreshTokenId`]: Refresh token row identifier

use uuid::Uuid;

// Type aliases for IDs
pub type ContainerId = Uuid;
pub type BlobId = Uuid;
pub type UserId = Uuid;
pub type RefreshTokenId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}
