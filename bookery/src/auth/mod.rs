//! Authentication system.
//!
//! # Authentication Methods
//!
//! Two ways of presenting the same JWT session token:
//!
//! ## 1. Bearer Authentication
//!
//! Token-based authentication for programmatic access:
//! - Obtain a token via `/api/v1/auth/login`
//! - Pass it in the `Authorization: Bearer <token>` header
//!
//! ## 2. Session Cookie Authentication
//!
//! Browser-based authentication using secure HTTP-only cookies:
//! - Users log in via `/api/v1/auth/login` with email/password
//! - The JWT is set as an HTTP-only cookie on the response
//! - Long-lived refresh tokens rotate at `/api/v1/auth/refresh`
//!
//! Tokens carry the issuer and audience from configuration and are verified
//! with no expiry leeway.
//!
//! # Modules
//!
//! - [`current_user`]: Extractor for getting the authenticated user in handlers
//! - [`password`]: Password hashing and verification using Argon2
//! - [`session`]: JWT session token creation and verification
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use bookery::api::models::users::CurrentUser;
//!
//! async fn protected_handler(user: CurrentUser) -> Result<String, Error> {
//!     Ok(format!("Hello, {}!", user.username))
//! }
//! ```

pub mod current_user;
pub mod password;
pub mod session;
