//! Registration and login handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};
use validator::Validate;

use pitchhub_models::{LoginRequest, RegisterRequest, UserPublic, UserType};

use crate::auth::{hash_password, is_bcrypt_hash, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::NewUser;
use crate::state::AppState;

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserPublic,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: UserPublic,
    pub token: String,
}

/// Create an account.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    if !request.has_required_fields() {
        return Err(ApiError::bad_request(
            "Name, email, password, and user type are required.",
        ));
    }

    let user_type = UserType::parse(&request.user_type).ok_or_else(|| {
        ApiError::bad_request("Invalid userType. Must be \"recruiter\" or \"talent\".")
    })?;

    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let email = request.email.trim().to_string();
    if state.users.find_by_email(&email).await?.is_some() {
        return Err(ApiError::conflict("Email already registered."));
    }

    let password_hash = hash_password(request.password.clone()).await?;
    let user = state
        .users
        .create(NewUser {
            name: request.name.trim().to_string(),
            email,
            password_hash,
            user_type,
            segment: request.normalized_segment(),
        })
        .await?;

    metrics::record_registration(user_type.as_str());

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user,
        }),
    ))
}

/// Exchange credentials for a session token.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    if request.email.is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let Some(record) = state.users.find_by_email(request.email.trim()).await? else {
        metrics::record_login(false);
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    if !is_bcrypt_hash(&record.password_hash) {
        warn!(user_id = record.id, "Login against a non-bcrypt password hash");
        metrics::record_login(false);
        return Err(ApiError::unauthorized(
            "Invalid credentials. Please re-register your account.",
        ));
    }

    if !verify_password(request.password, record.password_hash.clone()).await? {
        metrics::record_login(false);
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let user = record.to_public()?;
    let token = state.jwt.issue(&user)?;
    metrics::record_login(true);
    info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        user,
        token,
    }))
}
