use axum::{Json, body::Bytes, extract::State};

use crate::{
    AppState,
    api::models::{
        auth::{
            AuthResponse, AuthSuccessResponse, LoginInfo, LoginRequest, LoginResponse, LogoutRequest, LogoutResponse,
            RefreshRequest, RefreshResponse, RegisterRequest, RegisterResponse, RegistrationInfo,
        },
        users::{CurrentUser, UserResponse},
    },
    auth::{password, session},
    db::models::users::UserCreateDBRequest,
    errors::{Error, Result},
};

/// Get registration information
#[utoipa::path(
    get,
    path = "/auth/register",
    tag = "authentication",
    responses(
        (status = 200, description = "Registration info", body = RegistrationInfo),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_registration_info(State(state): State<AppState>) -> Result<Json<RegistrationInfo>> {
    let enabled = state.config.auth.native.enabled && state.config.auth.native.allow_registration;
    Ok(Json(RegistrationInfo {
        enabled,
        message: if enabled {
            "Registration is enabled".to_string()
        } else {
            "Registration is disabled".to_string()
        },
    }))
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "An account with this email or username already exists"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> Result<RegisterResponse> {
    // Check if native auth is enabled
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }

    // Check if registration is allowed
    if !state.config.auth.native.allow_registration {
        return Err(Error::BadRequest {
            message: "User registration is disabled".to_string(),
        });
    }

    // Validate password length
    let password_config = &state.config.auth.native.password;
    if request.password.len() < password_config.min_length {
        return Err(Error::BadRequest {
            message: format!("Password must be at least {} characters", password_config.min_length),
        });
    }
    if request.password.len() > password_config.max_length {
        return Err(Error::BadRequest {
            message: format!("Password must be no more than {} characters", password_config.max_length),
        });
    }

    // Hash the password on a blocking thread to avoid blocking async runtime
    let params = password::Argon2Params {
        memory_kib: password_config.argon2_memory_kib,
        iterations: password_config.argon2_iterations,
        parallelism: password_config.argon2_parallelism,
    };
    let password = request.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || password::hash_string_with_params(&password, Some(params)))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    let create_request = UserCreateDBRequest {
        username: request.username,
        email: request.email,
        display_name: request.display_name,
        is_admin: false,
        password_hash: Some(password_hash),
    };

    // A duplicate email or username surfaces as a unique violation (409)
    let created_user = state.users.create(&create_request).await?;
    let user_response = UserResponse::from(created_user);

    // Create session token
    let current_user = CurrentUser::from(user_response.clone());
    let token = session::create_session_token(&current_user, &state.config)?;

    // Set session cookie
    let cookie = create_session_cookie(&token, &state.config);

    let auth_response = AuthResponse {
        user: user_response,
        refresh_token: None,
        message: "Registration successful".to_string(),
    };

    Ok(RegisterResponse { auth_response, cookie })
}

/// Get login information
#[utoipa::path(
    get,
    path = "/auth/login",
    tag = "authentication",
    responses(
        (status = 200, description = "Login info", body = LoginInfo),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_login_info(State(state): State<AppState>) -> Result<Json<LoginInfo>> {
    Ok(Json(LoginInfo {
        enabled: state.config.auth.native.enabled,
        message: if state.config.auth.native.enabled {
            "Native login is enabled".to_string()
        } else {
            "Native login is disabled".to_string()
        },
    }))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse> {
    // Check if native auth is enabled
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }

    // Find user by email
    let user = state.users.get_by_email(&request.email).await?.ok_or_else(|| Error::Unauthenticated {
        message: Some("Invalid email or password".to_string()),
    })?;

    // Check if user has a password (native auth)
    let password_hash = user.password_hash.clone().ok_or_else(|| Error::Unauthenticated {
        message: Some("Invalid email or password".to_string()),
    })?;

    // Verify password on a blocking thread to avoid blocking async runtime
    let password = request.password.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&password, &password_hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(Error::Unauthenticated {
            message: Some("Invalid email or password".to_string()),
        });
    }

    // Logins get a refresh token alongside the session cookie
    let (refresh_token, _) = state.refresh_tokens.create_for_user(user.id, &state.config).await?;

    let user_response = UserResponse::from(user);

    // Create session token
    let current_user = CurrentUser::from(user_response.clone());
    let token = session::create_session_token(&current_user, &state.config)?;

    // Set session cookie
    let cookie = create_session_cookie(&token, &state.config);

    let auth_response = AuthResponse {
        user: user_response,
        refresh_token: Some(refresh_token),
        message: "Login successful".to_string(),
    };

    Ok(LoginResponse { auth_response, cookie })
}

/// Exchange a refresh token for a fresh session
///
/// Rotation is single-use: the presented token is revoked and a new one is
/// issued, so a replayed token fails with 401.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Session refreshed", body = AuthResponse),
        (status = 401, description = "Invalid refresh token"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn refresh(State(state): State<AppState>, Json(request): Json<RefreshRequest>) -> Result<RefreshResponse> {
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }

    let (token_id, secret) = session::parse_refresh_token(&request.refresh_token).ok_or_else(|| Error::Unauthenticated {
        message: Some("Invalid refresh token".to_string()),
    })?;

    let token = state
        .refresh_tokens
        .find_valid_token(token_id, secret)
        .await?
        .ok_or_else(|| Error::Unauthenticated {
            message: Some("Invalid refresh token".to_string()),
        })?;

    // The user behind the token may have been deleted since issuance
    let user = state.users.get_by_id(token.user_id).await?.ok_or_else(|| Error::Unauthenticated {
        message: Some("Invalid refresh token".to_string()),
    })?;

    // Rotate: spend the presented token before issuing its replacement
    state.refresh_tokens.revoke(token.id).await?;
    let (refresh_token, _) = state.refresh_tokens.create_for_user(user.id, &state.config).await?;

    let user_response = UserResponse::from(user);
    let current_user = CurrentUser::from(user_response.clone());
    let session_token = session::create_session_token(&current_user, &state.config)?;
    let cookie = create_session_cookie(&session_token, &state.config);

    let auth_response = AuthResponse {
        user: user_response,
        refresh_token: Some(refresh_token),
        message: "Session refreshed".to_string(),
    };

    Ok(RefreshResponse { auth_response, cookie })
}

/// Logout (clear session)
///
/// The body is optional; when present it may name a refresh token to revoke
/// along with clearing the session cookie.
#[utoipa::path(
    post,
    path = "/auth/logout",
    request_body(content = LogoutRequest, description = "Optional refresh token to revoke"),
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful", body = AuthSuccessResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, body: Bytes) -> Result<LogoutResponse> {
    if !body.is_empty() {
        let request: LogoutRequest = serde_json::from_slice(&body).map_err(|e| Error::BadRequest {
            message: format!("Invalid logout payload: {e}"),
        })?;

        if let Some(raw) = request.refresh_token {
            // An unparseable token has nothing to revoke; logout still succeeds
            if let Some((token_id, _)) = session::parse_refresh_token(&raw) {
                let revoked = state.refresh_tokens.revoke(token_id).await?;
                tracing::debug!(revoked, "refresh token revocation on logout");
            }
        }
    }

    // Create expired cookie to clear session
    let cookie = format!(
        "{}=; Path=/; HttpOnly; Secure; SameSite=Strict; Max-Age=0",
        state.config.auth.native.session.cookie_name
    );

    let auth_response = AuthSuccessResponse {
        message: "Logout successful".to_string(),
    };

    Ok(LogoutResponse { auth_response, cookie })
}

/// Helper function to create a session cookie
fn create_session_cookie(token: &str, config: &crate::config::Config) -> String {
    let session_config = &config.auth.native.session;
    let max_age = session_config.timeout.as_secs();

    format!(
        "{}={}; Path=/; HttpOnly; Secure={}; SameSite={}; Max-Age={}",
        session_config.cookie_name, token, session_config.cookie_secure, session_config.cookie_same_site, max_age
    )
}
