//! Talent profile handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};
use validator::Validate;

use pitchhub_models::{Profile, ProfileUpdate, ProfileView};
use pitchhub_storage::Container;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::pitches::{MessageResponse, UploadResponse};
use crate::handlers::upload::{store_blob, UploadForm};
use crate::security::sanitize_filename;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ProfileResponse {
    pub profile: ProfileView,
}

/// Caller's own profile.
pub async fn get_my_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ProfileResponse>> {
    let profile = load_profile(&state, &user.id_string()).await?;
    Ok(Json(ProfileResponse {
        profile: to_view(&state, profile),
    }))
}

/// Create or merge-update the caller's profile.
pub async fn update_my_profile(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> ApiResult<Json<ProfileResponse>> {
    let Json(update) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    update
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let user_id = user.id_string();
    let mut profile = state
        .profiles
        .get(&user_id)
        .await?
        .unwrap_or_else(|| Profile::new(user_id.clone()));
    profile.apply(update);
    state.profiles.save(&profile).await?;

    Ok(Json(ProfileResponse {
        profile: to_view(&state, profile),
    }))
}

/// Remove the caller's profile record. The photo object is kept.
pub async fn delete_my_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<MessageResponse>> {
    let user_id = user.id_string();
    load_profile(&state, &user_id).await?;
    state.profiles.delete(&user_id).await?;

    Ok(Json(MessageResponse {
        message: "Profile deleted successfully".to_string(),
    }))
}

/// Upload a profile photo for the caller.
pub async fn upload_profile_photo(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let form = UploadForm::read(multipart).await?;
    let file = form
        .file
        .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
    let file_name = sanitize_filename(&file.file_name)
        .ok_or_else(|| ApiError::bad_request("Invalid file name"))?;

    let user_id = user.id_string();
    let key = format!("{}/{}", user_id, file_name);
    let url = store_blob(&state, file.data, &key, Container::Profiles).await?;

    let mut profile = state
        .profiles
        .get(&user_id)
        .await?
        .unwrap_or_else(|| Profile::new(user_id.clone()));
    profile.photo_file_name = Some(key);
    profile.updated_at = chrono::Utc::now();
    state.profiles.save(&profile).await?;

    info!(user_id = user.id, "Profile photo uploaded");

    Ok(Json(UploadResponse {
        message: "Profile photo uploaded successfully".to_string(),
        url,
    }))
}

/// Public view of any user's profile.
pub async fn get_public_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ProfileResponse>> {
    let profile = load_profile(&state, &user_id).await?;
    Ok(Json(ProfileResponse {
        profile: to_view(&state, profile),
    }))
}

async fn load_profile(state: &AppState, user_id: &str) -> ApiResult<Profile> {
    state
        .profiles
        .get(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found"))
}

fn to_view(state: &AppState, profile: Profile) -> ProfileView {
    let photo_url = profile.photo_file_name.as_deref().and_then(|key| {
        state
            .signer()
            .issue(key, Container::Profiles)
            .map_err(|e| warn!(user_id = %profile.user_id, error = %e, "Could not mint photo URL"))
            .ok()
    });
    ProfileView::from_profile(profile, photo_url)
}
