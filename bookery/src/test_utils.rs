//! Test utilities for integration testing (available with `test-utils` feature).

use crate::config::{NativeAuthConfig, PasswordConfig, SessionConfig};
use crate::db::handlers::{
    BlobRepository, ContainerStore, RefreshTokenStore, UserStore,
    blob_storage::{BlobStorage, InMemoryBlobStorage},
    containers::InMemoryContainers,
    refresh_tokens::InMemoryRefreshTokens,
    users::InMemoryUsers,
};
use axum_test::TestServer;
use std::sync::Arc;

pub fn create_test_config() -> crate::config::Config {
    crate::config::Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: None,
        database: crate::config::DatabaseConfig::Memory,
        storage: crate::config::StorageConfig::Memory { page_size: None },
        admin_email: "admin@test.com".to_string(),
        admin_password: None,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        auth: crate::config::AuthConfig {
            native: NativeAuthConfig {
                enabled: true,
                allow_registration: true,
                password: PasswordConfig {
                    // Fast Argon2 parameters; the production defaults would dominate test time
                    argon2_memory_kib: 1024,
                    argon2_iterations: 1,
                    argon2_parallelism: 1,
                    ..Default::default()
                },
                session: SessionConfig {
                    // The test client replays cookies over plain HTTP
                    cookie_secure: false,
                    ..Default::default()
                },
                ..Default::default()
            },
            security: crate::config::SecurityConfig::default(),
        },
        enable_otel_export: false,
    }
}

/// Application state over fresh in-memory backends
pub fn create_test_state() -> crate::AppState {
    create_test_state_with_config(create_test_config())
}

/// Application state over fresh in-memory backends with a custom configuration
pub fn create_test_state_with_config(config: crate::config::Config) -> crate::AppState {
    let users: Arc<dyn UserStore> = Arc::new(InMemoryUsers::new());
    let refresh_tokens: Arc<dyn RefreshTokenStore> = Arc::new(InMemoryRefreshTokens::new());
    let containers: Arc<dyn ContainerStore> = Arc::new(InMemoryContainers::new());
    let storage: Arc<dyn BlobStorage> = Arc::new(InMemoryBlobStorage::new(None));

    crate::AppState::builder()
        .config(config)
        .users(users)
        .refresh_tokens(refresh_tokens)
        .blobs(BlobRepository::new(containers, storage))
        .build()
}

/// Full application over in-memory backends, served through a test client
pub async fn create_test_app() -> TestServer {
    let app = crate::Application::new(create_test_config()).await.expect("Failed to create application");

    let (server, _bg_services) = app.into_test_server();
    server
}
