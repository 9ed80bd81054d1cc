//! Storage layer for metadata persistence and blob access.
//!
//! Metadata (containers, users, refresh tokens) lives behind store traits
//! with a SQLx/PostgreSQL implementation and an in-memory one; blob content
//! lives behind [`handlers::blob_storage::BlobStorage`] with S3 and in-memory
//! backends. Which implementation runs is decided once, from configuration,
//! at application startup.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  API Handlers    │
//! └────────┬─────────┘
//!          │
//!          ↓
//! ┌──────────────────┐
//! │  BlobRepository  │  (container/blob rules across both sides)
//! └───┬──────────┬───┘
//!     │          │
//!     ↓          ↓
//! ┌────────┐ ┌─────────────┐
//! │ Stores │ │ BlobStorage │
//! └───┬────┘ └──────┬──────┘
//!     ↓             ↓
//! PostgreSQL      S3 bucket per container
//! (or memory)     (or memory)
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Store traits, their backends, and the blob repository
//! - [`models`]: Record structures matching table schemas
//! - [`errors`]: Database-specific error types
//!
//! # Migrations
//!
//! Database migrations are managed by SQLx and located in the `migrations/`
//! directory. The [`crate::migrator`] function provides access to the
//! migrator:
//!
//! ```ignore
//! bookery::migrator().run(&pool).await?;
//! ```

pub mod errors;
pub mod handlers;
pub mod models;
