//! Database models for refresh tokens.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::{RefreshTokenId, UserId};

/// Database entity model
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub id: RefreshTokenId,
    pub user_id: UserId,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    #[allow(dead_code)]
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Request for creating a refresh token
#[derive(Debug, Clone)]
pub struct RefreshTokenCreateRequest {
    pub user_id: UserId,
    pub raw_secret: String,
    pub expires_at: DateTime<Utc>,
    pub argon2_params: crate::auth::password::Argon2Params,
}
