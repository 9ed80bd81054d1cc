//! Database record models matching table schemas.
//!
//! Struct definitions that correspond to database table rows (or, for
//! [`blobs`], to entries assembled from object storage listings). These
//! models are used by the store handlers to return query results and accept
//! insertion data, and are kept distinct from API models so storage and API
//! representations can evolve independently.
//!
//! Models that map table rows derive `sqlx::FromRow` for query results and
//! use the ID aliases from [`crate::types`].

pub mod blobs;
pub mod containers;
pub mod refresh_tokens;
pub mod users;
