use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::users::{CurrentUser, UserResponse},
    errors::{Error, Result},
};

/// Get the authenticated user's profile
///
/// Looks the record up fresh by email rather than trusting the session
/// claims, so a deleted account turns into a 404 even with a live session.
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    responses(
        (status = 200, description = "The authenticated user", body = UserResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "User record no longer exists"),
    ),
    security(
        ("session_token" = []),
        ("bearer_auth" = [])
    )
)]
#[tracing::instrument(skip_all, fields(email = %current_user.email))]
pub async fn get_current_user(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<UserResponse>> {
    let user = state
        .users
        .get_by_email(&current_user.email)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "User".to_string(),
            id: current_user.email.clone(),
        })?;

    Ok(Json(UserResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::auth::AuthResponse;
    use crate::test_utils::create_test_app;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_me_requires_authentication() {
        let server = create_test_app().await;

        let response = server.get("/api/v1/users/me").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_returns_registered_user() {
        let server = create_test_app().await;

        let register = server
            .post("/api/v1/auth/register")
            .json(&serde_json::json!({
                "username": "testuser",
                "email": "test@example.com",
                "password": "password123",
                "display_name": "Test User"
            }))
            .await;
        register.assert_status(StatusCode::CREATED);
        let registered: AuthResponse = register.json();

        // The session JWT is the value of the session cookie
        let cookie = register.headers().get("set-cookie").unwrap().to_str().unwrap();
        let token = cookie
            .split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
            .map(|(_, value)| value)
            .unwrap();

        let response = server
            .get("/api/v1/users/me")
            .add_header("authorization", format!("Bearer {token}"))
            .await;
        response.assert_status_ok();

        let me: UserResponse = response.json();
        assert_eq!(me.id, registered.user.id);
        assert_eq!(me.email, "test@example.com");
        assert_eq!(me.username, "testuser");
        assert_eq!(me.display_name.as_deref(), Some("Test User"));
        assert!(!me.is_admin);
    }
}
