//! # Bookery: Container and Blob Storage Backend
//!
//! `bookery` is a thin backend for storing named blobs in containers, backed by
//! S3-compatible object storage, with native user accounts in front of it. It
//! provides a RESTful API for creating containers, uploading and listing blobs,
//! and downloading container contents in bulk.
//!
//! ## Overview
//!
//! Containers lead a double life: each one is a record in the metadata store
//! (its ID and display name) and a physical container in blob storage (the
//! bucket holding the payloads). Blobs live only in blob storage, keyed by a
//! generated ID with the display name carried as object metadata, so duplicate
//! names within a container are allowed. The [`db`] layer owns the rules for
//! keeping the two sides coherent.
//!
//! The metadata store runs on PostgreSQL in production, and blob payloads go to
//! S3 or any S3-compatible service (MinIO, localstack). Both sides also ship an
//! in-memory backend, which is what the test suite and quick local runs use;
//! the backend choice is purely a matter of configuration.
//!
//! ### Request Flow
//!
//! A request to `/api/v1/containers/{id}/blobs` passes the tracing and CORS
//! middleware, hits the handler in [`api::handlers::blobs`], and lands on the
//! [`db::handlers::BlobRepository`] which consults blob storage (existence,
//! listing pages, payloads) and the metadata store as needed. Authentication
//! endpoints under `/api/v1/auth/*` issue JWT session tokens, delivered both as
//! an HTTP-only cookie for browsers and in the response body for programmatic
//! clients, plus single-use refresh tokens for session renewal.
//!
//! ### Core Components
//!
//! The **API layer** ([`api`]) exposes the container/blob surface and the
//! authentication endpoints under `/api/v1/*`, with interactive OpenAPI
//! documentation served at `/docs`.
//!
//! The **authentication layer** ([`auth`]) covers Argon2 password hashing, JWT
//! session tokens (bearer header or cookie), and the refresh token scheme.
//!
//! The **storage layer** ([`db`]) holds the store traits, their PostgreSQL and
//! in-memory implementations, the [`db::handlers::BlobStorage`] backends, and
//! the repository tying containers and blobs together.
//!
//! **Background services** run alongside the HTTP server; today that is a
//! periodic sweep deleting expired refresh tokens.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use bookery::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Parse CLI arguments and load configuration
//!     let args = bookery::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     // Initialize telemetry (structured logging and optional OpenTelemetry)
//!     bookery::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     // Create and start the application
//!     let app = Application::new(config).await?;
//!
//!     // Run with graceful shutdown on Ctrl+C
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! With a PostgreSQL metadata store the migrations run automatically on
//! startup:
//!
//! ```no_run
//! # use sqlx::PgPool;
//! # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
//! // Run migrations
//! bookery::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod telemetry;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use crate::{
    auth::password,
    config::{CorsOrigin, DatabaseConfig},
    db::handlers::{
        BlobRepository, ContainerStore, RefreshTokenStore, UserStore,
        containers::{InMemoryContainers, PgContainers},
        create_blob_storage,
        refresh_tokens::{InMemoryRefreshTokens, PgRefreshTokens},
        users::{InMemoryUsers, PgUsers},
    },
    db::models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    openapi::ApiDoc,
};
use axum::http::HeaderValue;
use axum::{
    Router, http,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{BlobId, ContainerId, RefreshTokenId, UserId};

/// Application state shared across all request handlers.
///
/// This struct contains all the shared resources needed by the API handlers:
/// the configuration plus the store trait objects picked at startup. Which
/// backend sits behind each trait is invisible from here.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .users(users)
///     .refresh_tokens(refresh_tokens)
///     .blobs(blobs)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserStore>,
    pub refresh_tokens: Arc<dyn RefreshTokenStore>,
    pub blobs: BlobRepository,
}

/// Get the bookery database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// This function is idempotent - it will create a new admin user if one doesn't
/// exist, or update the password if the user already exists. This is typically
/// called during application startup to ensure there's always an admin user
/// available.
///
/// # Arguments
///
/// - `email`: Email address for the admin user (also used as username)
/// - `password`: Optional password. If `None`, an existing user is left untouched
/// - `users`: The user store to bootstrap into
///
/// # Returns
///
/// Returns the user ID of the created or existing admin user.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(email: &str, password: Option<&str>, users: &dyn UserStore) -> db::errors::Result<UserId> {
    // Hash password if provided
    let password_hash = match password {
        Some(pwd) => Some(password::hash_string(pwd).map_err(|e| anyhow::anyhow!("Failed to hash admin password: {e}"))?),
        None => None,
    };

    // Check if user already exists
    if let Some(existing_user) = users.get_by_email(email).await? {
        // User exists - update password if provided
        if password_hash.is_some() {
            users
                .update(
                    existing_user.id,
                    &UserUpdateDBRequest {
                        password_hash,
                        ..Default::default()
                    },
                )
                .await?;
        }
        return Ok(existing_user.id);
    }

    // Create new admin user
    let user_create = UserCreateDBRequest {
        username: email.to_string(),
        email: email.to_string(),
        display_name: None,
        is_admin: true,
        password_hash,
    };

    let created_user = users.create(&user_create).await?;
    Ok(created_user.id)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.security.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut exposed_headers = Vec::new();
    for header in &config.auth.security.cors.exposed_headers {
        exposed_headers.push(header.parse::<http::HeaderName>()?);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(config.auth.security.cors.allow_credentials)
        .expose_headers(exposed_headers);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
///
/// This function constructs the complete Axum router with:
/// - Authentication routes (registration, login, refresh, logout)
/// - Container and blob routes
/// - The current-user endpoint
/// - Interactive OpenAPI documentation at `/docs`
/// - CORS configuration
/// - Tracing middleware
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    // Authentication routes
    let auth_routes = Router::new()
        .route(
            "/auth/register",
            get(api::handlers::auth::get_registration_info).post(api::handlers::auth::register),
        )
        .route(
            "/auth/login",
            get(api::handlers::auth::get_login_info).post(api::handlers::auth::login),
        )
        .route("/auth/refresh", post(api::handlers::auth::refresh))
        .route("/auth/logout", post(api::handlers::auth::logout));

    // Container, blob, and user routes
    let api_routes = Router::new()
        .route(
            "/containers",
            get(api::handlers::containers::list_containers).post(api::handlers::containers::create_container),
        )
        .route(
            "/containers/{container_id}/blobs",
            get(api::handlers::blobs::list_blobs).post(api::handlers::blobs::upload_blob),
        )
        .route("/containers/{container_id}/blobs/content", get(api::handlers::blobs::get_blobs))
        .route("/users/me", get(api::handlers::users::get_current_user));

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api/v1", auth_routes.merge(api_routes).with_state(state.clone()))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    // Create CORS layer from config
    let cors_layer = create_cors_layer(&state.config)?;
    let router = router.layer(cors_layer);

    // Add tracing layer
    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Container for background services and their lifecycle management.
///
/// The only background task today is the refresh token cleaner, which
/// periodically deletes expired tokens so the store does not grow without
/// bound.
///
/// # Graceful Shutdown
///
/// The struct provides a [`shutdown`](BackgroundServices::shutdown) method to
/// gracefully stop all background tasks. When dropped, the `drop_guard` will
/// automatically cancel the shutdown token, signaling all tasks to stop.
pub struct BackgroundServices {
    background_tasks: Vec<tokio::task::JoinHandle<()>>,
    shutdown_token: tokio_util::sync::CancellationToken,
    // Pub so that we can disarm it if we want to
    pub drop_guard: Option<tokio_util::sync::DropGuard>,
}

impl BackgroundServices {
    /// Gracefully shutdown all background tasks
    pub async fn shutdown(self) {
        // Signal all background tasks to shutdown
        self.shutdown_token.cancel();

        // Wait for all background tasks to complete
        for handle in self.background_tasks {
            let _ = handle.await;
        }
    }
}

/// Setup background services (refresh token cleanup)
fn setup_background_services(
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    config: &Config,
    shutdown_token: tokio_util::sync::CancellationToken,
) -> BackgroundServices {
    let drop_guard = shutdown_token.clone().drop_guard();
    // Track all background task handles for graceful shutdown
    let mut background_tasks = Vec::new();

    let cleanup_interval = config.auth.native.refresh.cleanup_interval;
    let cleaner_shutdown = shutdown_token.clone();
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cleanup_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match refresh_tokens.delete_expired().await {
                        Ok(0) => {}
                        Ok(deleted) => info!("Deleted {} expired refresh tokens", deleted),
                        Err(e) => tracing::error!("Refresh token cleanup failed: {}", e),
                    }
                }
                _ = cleaner_shutdown.cancelled() => break,
            }
        }
    });
    background_tasks.push(handle);

    BackgroundServices {
        background_tasks,
        shutdown_token,
        drop_guard: Some(drop_guard),
    }
}

/// Connect the configured metadata store backend.
///
/// For PostgreSQL this builds the connection pool from the configured settings,
/// runs migrations, and returns SQLx-backed stores; the in-memory variant needs
/// no setup. The pool is returned so the application can close it on shutdown.
async fn setup_metadata_stores(
    config: &Config,
) -> anyhow::Result<(Option<PgPool>, Arc<dyn UserStore>, Arc<dyn ContainerStore>, Arc<dyn RefreshTokenStore>)> {
    match &config.database {
        DatabaseConfig::Postgres { url, pool: settings } => {
            info!("Using PostgreSQL metadata store");
            let pool = PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .min_connections(settings.min_connections)
                .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
                // Zero means "never" for both timeouts
                .idle_timeout((settings.idle_timeout_secs > 0).then(|| Duration::from_secs(settings.idle_timeout_secs)))
                .max_lifetime((settings.max_lifetime_secs > 0).then(|| Duration::from_secs(settings.max_lifetime_secs)))
                .connect(url)
                .await?;

            migrator().run(&pool).await?;

            Ok((
                Some(pool.clone()),
                Arc::new(PgUsers::new(pool.clone())),
                Arc::new(PgContainers::new(pool.clone())),
                Arc::new(PgRefreshTokens::new(pool)),
            ))
        }
        DatabaseConfig::Memory => {
            info!("Using in-memory metadata stores (records are lost on restart)");
            Ok((
                None,
                Arc::new(InMemoryUsers::new()),
                Arc::new(InMemoryContainers::new()),
                Arc::new(InMemoryRefreshTokens::new()),
            ))
        }
    }
}

/// Main application struct that owns all resources and lifecycle.
///
/// This is the top-level container for the entire application, managing:
/// - HTTP server and routing
/// - Metadata store and blob storage backends
/// - Application configuration
/// - Background services (refresh token cleanup)
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] initializes all resources, runs
///    migrations, bootstraps the admin user, and starts background services
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal is received, gracefully stops all services
pub struct Application {
    router: Router,
    config: Config,
    // Present only when the metadata store is PostgreSQL
    pool: Option<PgPool>,
    bg_services: BackgroundServices,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting bookery with configuration: {:#?}", config);

        // Setup the metadata stores and run migrations
        let (pool, users, containers, refresh_tokens) = setup_metadata_stores(&config).await?;

        // Setup the physical blob storage backend
        let storage = create_blob_storage(&config.storage).await?;
        let blobs = BlobRepository::new(containers, storage);

        // Bootstrap the admin account; skipped when no admin password is configured
        if config.admin_password.is_some() {
            let admin_id = create_initial_admin_user(&config.admin_email, config.admin_password.as_deref(), users.as_ref())
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {}", e))?;
            info!("Admin user {} ready ({})", config.admin_email, admin_id);
        }

        // Create a shutdown token for coordinating graceful shutdown of background tasks
        let shutdown_token = tokio_util::sync::CancellationToken::new();
        let bg_services = setup_background_services(refresh_tokens.clone(), &config, shutdown_token);

        // Build app state and router
        let app_state = AppState::builder()
            .config(config.clone())
            .users(users)
            .refresh_tokens(refresh_tokens)
            .blobs(blobs)
            .build();

        let router = build_router(&app_state)?;

        Ok(Self {
            router,
            config,
            pool,
            bg_services,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(any(test, feature = "test-utils"))]
    pub fn into_test_server(self) -> (axum_test::TestServer, BackgroundServices) {
        let server = axum_test::TestServer::new(self.router).expect("Failed to create test server");
        (server, self.bg_services)
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Bookery listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        // Run the server with graceful shutdown
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        // Shutdown background services and wait for tasks to complete
        self.bg_services.shutdown().await;

        // Close database connections
        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        // Shutdown telemetry
        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::create_initial_admin_user;
    use crate::auth::password;
    use crate::db::handlers::users::{InMemoryUsers, UserStore};
    use crate::test_utils::*;

    #[test_log::test(tokio::test)]
    async fn test_create_initial_admin_user_is_idempotent() {
        let users = InMemoryUsers::new();

        let first = create_initial_admin_user("admin@example.com", Some("first-password"), &users).await.unwrap();
        let second = create_initial_admin_user("admin@example.com", Some("second-password"), &users).await.unwrap();
        assert_eq!(first, second);

        let user = users.get_by_email("admin@example.com").await.unwrap().unwrap();
        assert!(user.is_admin);
        assert_eq!(user.username, "admin@example.com");
        // The stored hash follows the latest bootstrap password
        assert!(password::verify_string("second-password", user.password_hash.as_deref().unwrap()).unwrap());
        assert!(!password::verify_string("first-password", user.password_hash.as_deref().unwrap()).unwrap());
    }

    #[test_log::test(tokio::test)]
    async fn test_create_initial_admin_user_without_password_keeps_existing_hash() {
        let users = InMemoryUsers::new();

        create_initial_admin_user("admin@example.com", Some("bootstrap-password"), &users).await.unwrap();
        create_initial_admin_user("admin@example.com", None, &users).await.unwrap();

        let user = users.get_by_email("admin@example.com").await.unwrap().unwrap();
        assert!(password::verify_string("bootstrap-password", user.password_hash.as_deref().unwrap()).unwrap());
    }

    #[test_log::test(tokio::test)]
    async fn test_healthz() {
        let server = create_test_app().await;

        let response = server.get("/healthz").await;
        response.assert_status_ok();
        response.assert_text("OK");
    }

    #[test_log::test(tokio::test)]
    async fn test_docs_page_is_served() {
        let server = create_test_app().await;

        let response = server.get("/docs").await;
        response.assert_status_ok();
    }

    #[test_log::test(tokio::test)]
    async fn test_cors_headers_for_allowed_origin() {
        let server = create_test_app().await;

        // The test config allows the development frontend origin
        let response = server.get("/healthz").add_header("origin", "http://localhost:5173").await;
        response.assert_status_ok();
        response.assert_header("access-control-allow-origin", "http://localhost:5173");
    }

    #[test_log::test(tokio::test)]
    async fn test_unknown_route_is_404() {
        let server = create_test_app().await;

        let response = server.get("/api/v1/nonexistent").await;
        response.assert_status_not_found();
    }

    #[test_log::test(tokio::test)]
    async fn test_admin_bootstrap_can_log_in() {
        let mut config = create_test_config();
        config.admin_email = "root@bookery.dev".to_string();
        config.admin_password = Some("admin-password-123".to_string());

        let app = crate::Application::new(config).await.unwrap();
        let (server, _bg_services) = app.into_test_server();

        let response = server
            .post("/api/v1/auth/login")
            .json(&serde_json::json!({
                "email": "root@bookery.dev",
                "password": "admin-password-123"
            }))
            .await;
        response.assert_status_ok();
    }
}
