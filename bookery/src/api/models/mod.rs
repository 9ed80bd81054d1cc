//! API request and response data models.
//!
//! These are the structures serialized over HTTP, kept separate from the
//! database models so the API contract and storage representations can evolve
//! independently. All of them carry `utoipa` annotations for the generated
//! OpenAPI document.
//!
//! - [`containers`]: container creation and listing payloads
//! - [`blobs`]: blob listing and content-download payloads
//! - [`users`]: user responses and the authenticated identity
//! - [`auth`]: login, registration, refresh, and logout payloads

pub mod auth;
pub mod blobs;
pub mod containers;
pub mod users;
