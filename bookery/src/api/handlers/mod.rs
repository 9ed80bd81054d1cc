//! HTTP request handlers for all API endpoints.
//!
//! This module contains Axum route handlers organized by resource type.
//! Each handler is responsible for:
//! - Request validation and deserialization
//! - Authentication checks where a route needs a logged-in user
//! - Business logic execution via the stores and the blob repository
//! - Response serialization
//!
//! # Handler Modules
//!
//! - [`auth`]: Registration, login, session refresh, and logout
//! - [`blobs`]: Blob upload, listing, and content retrieval within a container
//! - [`containers`]: Container creation and listing
//! - [`users`]: Current user profile
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`] which automatically converts to
//! appropriate HTTP status codes and JSON error responses.

pub mod auth;
pub mod blobs;
pub mod containers;
pub mod users;
