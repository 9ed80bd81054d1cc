//! API request/response models for authentication.
//!
//! Responses that set or clear the session cookie are wrapper types whose
//! `IntoResponse` impl attaches the `Set-Cookie` header next to the JSON body.

use crate::api::models::users::UserResponse;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegistrationInfo {
    pub enabled: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginInfo {
    pub enabled: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    /// Wire token issued at login, `<id>.<secret>`
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogoutRequest {
    /// Refresh token to revoke alongside clearing the session cookie
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    /// Only present on flows that issue or rotate a refresh token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthSuccessResponse {
    pub message: String,
}

/// 201 response carrying the session cookie for a freshly registered user
pub struct RegisterResponse {
    pub auth_response: AuthResponse,
    pub cookie: String,
}

impl IntoResponse for RegisterResponse {
    fn into_response(self) -> Response {
        with_cookie(StatusCode::CREATED, Json(self.auth_response), &self.cookie)
    }
}

/// 200 response carrying the session cookie for a logged-in user
pub struct LoginResponse {
    pub auth_response: AuthResponse,
    pub cookie: String,
}

impl IntoResponse for LoginResponse {
    fn into_response(self) -> Response {
        with_cookie(StatusCode::OK, Json(self.auth_response), &self.cookie)
    }
}

/// 200 response carrying a fresh session cookie after token rotation
pub struct RefreshResponse {
    pub auth_response: AuthResponse,
    pub cookie: String,
}

impl IntoResponse for RefreshResponse {
    fn into_response(self) -> Response {
        with_cookie(StatusCode::OK, Json(self.auth_response), &self.cookie)
    }
}

/// 200 response clearing the session cookie
pub struct LogoutResponse {
    pub auth_response: AuthSuccessResponse,
    pub cookie: String,
}

impl IntoResponse for LogoutResponse {
    fn into_response(self) -> Response {
        with_cookie(StatusCode::OK, Json(self.auth_response), &self.cookie)
    }
}

fn with_cookie<B: IntoResponse>(status: StatusCode, body: B, cookie: &str) -> Response {
    let mut response = (status, body).into_response();
    // Cookie strings are built from validated config values, so this only
    // fails on a malformed session token, in which case the cookie is dropped
    if let Ok(value) = HeaderValue::from_str(cookie) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}
