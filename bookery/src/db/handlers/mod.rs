//! Store traits and their backend implementations.
//!
//! Each entity gets a store trait, one implementation per backend, and the
//! application picks a backend from configuration at startup. Handlers only
//! ever see the trait objects.
//!
//! # Available Stores
//!
//! - [`ContainerStore`]: Container metadata records
//! - [`UserStore`]: User accounts and credential lookups
//! - [`RefreshTokenStore`]: Refresh token lifecycle
//! - [`BlobStorage`]: Physical containers and blob content
//!
//! [`BlobRepository`] sits on top of [`ContainerStore`] and [`BlobStorage`]
//! and implements the container/blob operations used by the API.

pub mod blob_repository;
pub mod blob_storage;
pub mod containers;
pub mod refresh_tokens;
pub mod users;

pub use blob_repository::BlobRepository;
pub use blob_storage::{BlobStorage, create_blob_storage};
pub use containers::ContainerStore;
pub use refresh_tokens::RefreshTokenStore;
pub use users::UserStore;
