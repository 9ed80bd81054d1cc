//! Database repository for users.

use crate::db::{
    errors::{DbError, Result},
    models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
};
use crate::types::{UserId, abbrev_uuid};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

/// Trait for user stores
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user, generating a fresh ID
    async fn create(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse>;

    /// Look up a user by ID
    async fn get_by_id(&self, id: UserId) -> Result<Option<UserDBResponse>>;

    /// Look up a user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<UserDBResponse>>;

    /// Update a user, leaving unset fields untouched
    async fn update(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<UserDBResponse>;
}

// ============================================================================
// PostgreSQL Implementation
// ============================================================================

/// PostgreSQL-backed user store
pub struct PgUsers {
    pool: PgPool,
}

impl PgUsers {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, username, email, display_name, created_at, updated_at, is_admin, password_hash";

#[async_trait]
impl UserStore for PgUsers {
    #[instrument(skip(self, request), fields(username = %request.username), err)]
    async fn create(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        // Always generate a new ID for users
        let user_id = Uuid::new_v4();

        let query = format!(
            "INSERT INTO users (id, username, email, display_name, is_admin, password_hash) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, UserDBResponse>(&query)
            .bind(user_id)
            .bind(&request.username)
            .bind(&request.email)
            .bind(&request.display_name)
            .bind(request.is_admin)
            .bind(&request.password_hash)
            .fetch_one(&self.pool)
            .await?;

        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&self, id: UserId) -> Result<Option<UserDBResponse>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, UserDBResponse>(&query).bind(id).fetch_optional(&self.pool).await?;

        Ok(user)
    }

    #[instrument(skip(self, email), err)]
    async fn get_by_email(&self, email: &str) -> Result<Option<UserDBResponse>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, UserDBResponse>(&query).bind(email).fetch_optional(&self.pool).await?;

        Ok(user)
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<UserDBResponse> {
        let query = format!(
            "UPDATE users SET
                display_name = COALESCE($2, display_name),
                password_hash = COALESCE($3, password_hash),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, UserDBResponse>(&query)
            .bind(id)
            .bind(&request.display_name)
            .bind(&request.password_hash)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(user)
    }
}

// ============================================================================
// In-Memory Implementation
// ============================================================================

/// In-memory user store
/// Useful for development and testing
#[derive(Default)]
pub struct InMemoryUsers {
    users: RwLock<Vec<UserDBResponse>>,
}

impl InMemoryUsers {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUsers {
    async fn create(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        let mut users = self.users.write().await;

        // Mirror the unique indexes enforced by the database schema
        if users.iter().any(|u| u.email == request.email) {
            return Err(DbError::UniqueViolation {
                constraint: Some("users_email_key".to_string()),
                table: Some("users".to_string()),
                message: format!("duplicate email {}", request.email),
            });
        }
        if users.iter().any(|u| u.username == request.username) {
            return Err(DbError::UniqueViolation {
                constraint: Some("users_username_key".to_string()),
                table: Some("users".to_string()),
                message: format!("duplicate username {}", request.username),
            });
        }

        let now = Utc::now();
        let user = UserDBResponse {
            id: Uuid::new_v4(),
            username: request.username.clone(),
            email: request.email.clone(),
            display_name: request.display_name.clone(),
            created_at: now,
            updated_at: now,
            is_admin: request.is_admin,
            password_hash: request.password_hash.clone(),
        };
        users.push(user.clone());

        Ok(user)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<UserDBResponse>> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserDBResponse>> {
        Ok(self.users.read().await.iter().find(|u| u.email == email).cloned())
    }

    async fn update(&self, id: UserId, request: &UserUpdateDBRequest) -> Result<UserDBResponse> {
        let mut users = self.users.write().await;
        let user = users.iter_mut().find(|u| u.id == id).ok_or(DbError::NotFound)?;

        if let Some(display_name) = &request.display_name {
            user.display_name = Some(display_name.clone());
        }
        if let Some(password_hash) = &request.password_hash {
            user.password_hash = Some(password_hash.clone());
        }
        user.updated_at = Utc::now();

        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(username: &str, email: &str) -> UserCreateDBRequest {
        UserCreateDBRequest {
            username: username.to_string(),
            email: email.to_string(),
            display_name: None,
            is_admin: false,
            password_hash: Some("$argon2id$dummy".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup_user() {
        let store = InMemoryUsers::new();

        let created = store.create(&create_request("testuser", "test@example.com")).await.unwrap();
        assert_eq!(created.username, "testuser");
        assert_eq!(created.email, "test@example.com");
        assert!(!created.is_admin);

        let by_id = store.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.id, created.id);

        let by_email = store.get_by_email("test@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        assert!(store.get_by_email("missing@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let store = InMemoryUsers::new();
        store.create(&create_request("first", "same@example.com")).await.unwrap();

        let err = store.create(&create_request("second", "same@example.com")).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::UniqueViolation { ref constraint, .. } if constraint.as_deref() == Some("users_email_key")
        ));
    }

    #[tokio::test]
    async fn test_duplicate_username_is_unique_violation() {
        let store = InMemoryUsers::new();
        store.create(&create_request("same", "first@example.com")).await.unwrap();

        let err = store.create(&create_request("same", "second@example.com")).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::UniqueViolation { ref constraint, .. } if constraint.as_deref() == Some("users_username_key")
        ));
    }

    #[tokio::test]
    async fn test_update_only_touches_set_fields() {
        let store = InMemoryUsers::new();
        let created = store.create(&create_request("testuser", "test@example.com")).await.unwrap();

        let updated = store
            .update(
                created.id,
                &UserUpdateDBRequest {
                    password_hash: Some("$argon2id$new".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.password_hash.as_deref(), Some("$argon2id$new"));
        assert_eq!(updated.display_name, None);
        assert_eq!(updated.username, "testuser");
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found() {
        let store = InMemoryUsers::new();

        let err = store.update(Uuid::new_v4(), &UserUpdateDBRequest::default()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }
}
