//! Database repository for refresh tokens.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::password,
    config::Config,
    db::{
        errors::{DbError, Result},
        models::refresh_tokens::{RefreshToken, RefreshTokenCreateRequest},
    },
    types::{RefreshTokenId, UserId, abbrev_uuid},
};

/// Trait for refresh token stores
///
/// Tokens travel on the wire as `<id>.<secret>`; only an Argon2 hash of the
/// secret is persisted, so a leaked store cannot be replayed.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Persist a token, hashing the raw secret
    async fn create(&self, request: &RefreshTokenCreateRequest) -> Result<RefreshToken>;

    /// Look up a token by ID
    async fn get_by_id(&self, id: RefreshTokenId) -> Result<Option<RefreshToken>>;

    /// Mark a single token as revoked. Returns false if it was already revoked or missing
    async fn revoke(&self, id: RefreshTokenId) -> Result<bool>;

    /// Revoke all outstanding tokens for a user, returning how many were revoked
    async fn revoke_for_user(&self, user_id: UserId) -> Result<u64>;

    /// Remove tokens past their expiry, returning how many were deleted
    async fn delete_expired(&self) -> Result<u64>;

    /// Issue a token for a user
    ///
    /// Returns the wire token together with the stored entity. The wire token
    /// is the only place the raw secret ever appears.
    async fn create_for_user(&self, user_id: UserId, config: &Config) -> Result<(String, RefreshToken)> {
        let raw_secret = password::generate_token_secret();
        let expires_at = Utc::now()
            + chrono::Duration::from_std(config.auth.native.refresh.token_ttl).unwrap_or(chrono::Duration::days(30));

        let request = RefreshTokenCreateRequest {
            user_id,
            raw_secret: raw_secret.clone(),
            expires_at,
            argon2_params: password::Argon2Params {
                memory_kib: config.auth.native.password.argon2_memory_kib,
                iterations: config.auth.native.password.argon2_iterations,
                parallelism: config.auth.native.password.argon2_parallelism,
            },
        };

        let token = self.create(&request).await?;
        Ok((format!("{}.{}", token.id, raw_secret), token))
    }

    /// Find a live token by ID and verify the raw secret against its hash
    async fn find_valid_token(&self, token_id: RefreshTokenId, raw_secret: &str) -> Result<Option<RefreshToken>> {
        let token = self.get_by_id(token_id).await?;

        if let Some(token) = token {
            if token.revoked_at.is_some() {
                return Ok(None);
            }
            if Utc::now() > token.expires_at {
                return Ok(None);
            }

            match password::verify_string(raw_secret, &token.token_hash) {
                Ok(true) => Ok(Some(token)),
                Ok(false) => Ok(None),
                Err(e) => {
                    tracing::error!("Token verification error for token {}: {:?}", token_id, e);
                    Ok(None)
                }
            }
        } else {
            Ok(None)
        }
    }
}

// ============================================================================
// PostgreSQL Implementation
// ============================================================================

/// PostgreSQL-backed refresh token store
pub struct PgRefreshTokens {
    pool: PgPool,
}

impl PgRefreshTokens {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const TOKEN_COLUMNS: &str = "id, user_id, token_hash, expires_at, created_at, revoked_at";

#[async_trait]
impl RefreshTokenStore for PgRefreshTokens {
    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id)), err)]
    async fn create(&self, request: &RefreshTokenCreateRequest) -> Result<RefreshToken> {
        let token_hash = password::hash_string_with_params(&request.raw_secret, Some(request.argon2_params))
            .map_err(|e| DbError::Other(anyhow::anyhow!(e)))?;

        let query = format!("INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3) RETURNING {TOKEN_COLUMNS}");
        let token = sqlx::query_as::<_, RefreshToken>(&query)
            .bind(request.user_id)
            .bind(token_hash)
            .bind(request.expires_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(token)
    }

    #[instrument(skip(self, id), err)]
    async fn get_by_id(&self, id: RefreshTokenId) -> Result<Option<RefreshToken>> {
        let query = format!("SELECT {TOKEN_COLUMNS} FROM refresh_tokens WHERE id = $1");
        let token = sqlx::query_as::<_, RefreshToken>(&query).bind(id).fetch_optional(&self.pool).await?;

        Ok(token)
    }

    #[instrument(skip(self, id), err)]
    async fn revoke(&self, id: RefreshTokenId) -> Result<bool> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked_at = NOW() WHERE id = $1 AND revoked_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    async fn revoke_for_user(&self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), err)]
    async fn delete_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < NOW()").execute(&self.pool).await?;

        Ok(result.rows_affected())
    }
}

// ============================================================================
// In-Memory Implementation
// ============================================================================

/// In-memory refresh token store
/// Useful for development and testing
#[derive(Default)]
pub struct InMemoryRefreshTokens {
    tokens: RwLock<Vec<RefreshToken>>,
}

impl InMemoryRefreshTokens {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokens {
    async fn create(&self, request: &RefreshTokenCreateRequest) -> Result<RefreshToken> {
        let token_hash = password::hash_string_with_params(&request.raw_secret, Some(request.argon2_params))
            .map_err(|e| DbError::Other(anyhow::anyhow!(e)))?;

        let token = RefreshToken {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            token_hash,
            expires_at: request.expires_at,
            created_at: Utc::now(),
            revoked_at: None,
        };
        self.tokens.write().await.push(token.clone());

        Ok(token)
    }

    async fn get_by_id(&self, id: RefreshTokenId) -> Result<Option<RefreshToken>> {
        Ok(self.tokens.read().await.iter().find(|t| t.id == id).cloned())
    }

    async fn revoke(&self, id: RefreshTokenId) -> Result<bool> {
        let mut tokens = self.tokens.write().await;
        match tokens.iter_mut().find(|t| t.id == id && t.revoked_at.is_none()) {
            Some(token) => {
                token.revoked_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_for_user(&self, user_id: UserId) -> Result<u64> {
        let mut tokens = self.tokens.write().await;
        let mut revoked = 0;
        for token in tokens.iter_mut().filter(|t| t.user_id == user_id && t.revoked_at.is_none()) {
            token.revoked_at = Some(Utc::now());
            revoked += 1;
        }

        Ok(revoked)
    }

    async fn delete_expired(&self) -> Result<u64> {
        let mut tokens = self.tokens.write().await;
        let now = Utc::now();
        let before = tokens.len();
        tokens.retain(|t| t.expires_at >= now);

        Ok((before - tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_config;

    fn test_params() -> password::Argon2Params {
        password::Argon2Params {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[tokio::test]
    async fn test_issued_token_verifies() {
        let store = InMemoryRefreshTokens::new();
        let config = create_test_config();
        let user_id = Uuid::new_v4();

        let (wire_token, token) = store.create_for_user(user_id, &config).await.unwrap();

        let (id_part, secret) = wire_token.split_once('.').unwrap();
        assert_eq!(id_part.parse::<Uuid>().unwrap(), token.id);

        // Only the hash is stored
        assert_ne!(token.token_hash, secret);

        let found = store.find_valid_token(token.id, secret).await.unwrap();
        assert!(found.is_some());

        let wrong = store.find_valid_token(token.id, "not-the-secret").await.unwrap();
        assert!(wrong.is_none());
    }

    #[tokio::test]
    async fn test_revoked_token_is_rejected() {
        let store = InMemoryRefreshTokens::new();
        let user_id = Uuid::new_v4();

        let token = store
            .create(&RefreshTokenCreateRequest {
                user_id,
                raw_secret: "secret".to_string(),
                expires_at: Utc::now() + chrono::Duration::days(1),
                argon2_params: test_params(),
            })
            .await
            .unwrap();

        assert!(store.revoke(token.id).await.unwrap());
        // Second revoke is a no-op
        assert!(!store.revoke(token.id).await.unwrap());

        let found = store.find_valid_token(token.id, "secret").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let store = InMemoryRefreshTokens::new();

        let token = store
            .create(&RefreshTokenCreateRequest {
                user_id: Uuid::new_v4(),
                raw_secret: "secret".to_string(),
                expires_at: Utc::now() - chrono::Duration::minutes(1),
                argon2_params: test_params(),
            })
            .await
            .unwrap();

        let found = store.find_valid_token(token.id, "secret").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_revoke_for_user_leaves_other_users_alone() {
        let store = InMemoryRefreshTokens::new();
        let user_a = Uuid::new_v4();
        let user_b = Uuid::new_v4();

        for (user, secret) in [(user_a, "a1"), (user_a, "a2"), (user_b, "b1")] {
            store
                .create(&RefreshTokenCreateRequest {
                    user_id: user,
                    raw_secret: secret.to_string(),
                    expires_at: Utc::now() + chrono::Duration::days(1),
                    argon2_params: test_params(),
                })
                .await
                .unwrap();
        }

        assert_eq!(store.revoke_for_user(user_a).await.unwrap(), 2);

        let tokens = store.tokens.read().await;
        let b_token = tokens.iter().find(|t| t.user_id == user_b).unwrap();
        assert!(b_token.revoked_at.is_none());
    }

    #[tokio::test]
    async fn test_delete_expired_keeps_live_tokens() {
        let store = InMemoryRefreshTokens::new();

        for (secret, offset) in [("live", chrono::Duration::days(1)), ("dead", chrono::Duration::days(-1))] {
            store
                .create(&RefreshTokenCreateRequest {
                    user_id: Uuid::new_v4(),
                    raw_secret: secret.to_string(),
                    expires_at: Utc::now() + offset,
                    argon2_params: test_params(),
                })
                .await
                .unwrap();
        }

        assert_eq!(store.delete_expired().await.unwrap(), 1);
        assert_eq!(store.tokens.read().await.len(), 1);
    }
}
