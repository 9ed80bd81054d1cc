//! OpenAPI documentation configuration.
//!
//! Defines the schema served at `/docs`, covering the authentication,
//! container, blob, and user endpoints under `/api/v1`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api;

/// Registers the session cookie and bearer JWT security schemes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "session_token".to_string(),
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "bookery_session",
                    "Session cookie set by the register, login, and refresh endpoints.",
                ))),
            );
            components.security_schemes.insert(
                "bearer_auth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Session JWT in the `Authorization` header:\n\n\
                            ```\nAuthorization: Bearer <token>\n```\n\n\
                            Tokens are issued by the register, login, and refresh endpoints.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    servers(
        (url = "/api/v1", description = "Bookery API")
    ),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::auth::get_registration_info,
        api::handlers::auth::register,
        api::handlers::auth::get_login_info,
        api::handlers::auth::login,
        api::handlers::auth::refresh,
        api::handlers::auth::logout,
        api::handlers::containers::list_containers,
        api::handlers::containers::create_container,
        api::handlers::blobs::list_blobs,
        api::handlers::blobs::get_blobs,
        api::handlers::blobs::upload_blob,
        api::handlers::users::get_current_user,
    ),
    components(
        schemas(
            api::models::auth::RegistrationInfo,
            api::models::auth::LoginInfo,
            api::models::auth::RegisterRequest,
            api::models::auth::LoginRequest,
            api::models::auth::RefreshRequest,
            api::models::auth::LogoutRequest,
            api::models::auth::AuthResponse,
            api::models::auth::AuthSuccessResponse,
            api::models::containers::ContainerCreate,
            api::models::containers::ContainerResponse,
            api::models::blobs::BlobResponse,
            api::models::blobs::BlobContentResponse,
            api::models::users::UserResponse,
        )
    ),
    tags(
        (name = "authentication", description = "Registration, login, session refresh, and logout."),
        (name = "containers", description = "Create and list blob containers."),
        (name = "blobs", description = "Upload blobs and retrieve their metadata and content."),
        (name = "users", description = "Current user profile."),
    ),
    info(
        title = "Bookery API",
        version = "1.2.0",
        description = "Blob storage backend with container-scoped blobs and native user accounts.

## Authentication

Container and blob endpoints are open; the current-user endpoint requires a
session. Sessions are established via `/auth/register` or `/auth/login`, which
set a session cookie and (for login) return a single-use refresh token.

## Errors

Errors are returned as a plain-text message with the appropriate status
code; duplicate-account conflicts return a small JSON object naming the
resource.",
    ),
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_builds() {
        let doc = ApiDoc::openapi();

        let components = doc.components.as_ref().expect("components should be registered");
        assert!(components.security_schemes.contains_key("session_token"));
        assert!(components.security_schemes.contains_key("bearer_auth"));

        // Spot-check that the route set made it into the document
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/containers"));
        assert!(paths.iter().any(|p| p.as_str() == "/containers/{container_id}/blobs"));
        assert!(paths.iter().any(|p| p.as_str() == "/auth/login"));
        assert!(paths.iter().any(|p| p.as_str() == "/users/me"));
    }
}
