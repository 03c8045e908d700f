//! Pitch upload, listing and deletion.

use std::collections::HashSet;

use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use pitchhub_models::{Pitch, PitchId, PitchListItem, Uploader};
use pitchhub_storage::{object_key_from_url, Container};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::upload::{store_blob, UploadForm};
use crate::metrics;
use crate::security::{sanitize_filename, sanitize_text, MAX_CATEGORY_LENGTH, MAX_NOTE_LENGTH};
use crate::state::AppState;

#[derive(Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub url: String,
}

#[derive(Serialize)]
pub struct LatestPitchResponse {
    pub url: String,
}

#[derive(Serialize)]
pub struct PitchListResponse {
    pub pitches: Vec<PitchListItem>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PitchListQuery {
    pub category: Option<String>,
}

/// Upload a pitch file. Talent accounts only.
pub async fn upload_pitch(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    if !user.is_talent() {
        return Err(ApiError::forbidden("Only talent users can upload pitches"));
    }

    let form = UploadForm::read(multipart).await?;
    let category = form
        .field("category")
        .map(|c| sanitize_text(c, MAX_CATEGORY_LENGTH));
    let note = form.field("note").map(|n| sanitize_text(n, MAX_NOTE_LENGTH));

    let file = form
        .file
        .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
    let key = sanitize_filename(&file.file_name)
        .ok_or_else(|| ApiError::bad_request("Invalid file name"))?;

    // Same-named uploads replace the earlier object
    let url = store_blob(&state, file.data, &key, Container::Pitches).await?;

    let pitch = Pitch::new(user.id_string(), key, category, note, url.clone());
    state.pitches.create(&pitch).await?;

    info!(
        pitch_id = %pitch.id,
        user_id = user.id,
        file_name = pitch.file_name.as_deref().unwrap_or_default(),
        "Pitch uploaded"
    );

    Ok(Json(UploadResponse {
        message: "Pitch uploaded successfully".to_string(),
        url,
    }))
}

/// Newest pitch in a category, with a freshly minted URL.
pub async fn latest_pitch(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> ApiResult<Json<LatestPitchResponse>> {
    let pitch = state
        .pitches
        .latest_by_category(&category)
        .await?
        .ok_or_else(|| ApiError::not_found("No pitch found for this category"))?;

    let url = fresh_url(&state, &pitch)
        .or(pitch.file_url)
        .ok_or_else(|| ApiError::not_found("No pitch found for this category"))?;

    Ok(Json(LatestPitchResponse { url }))
}

/// All pitches, newest first, with uploader details and fresh URLs.
pub async fn list_pitches(
    State(state): State<AppState>,
    Query(query): Query<PitchListQuery>,
) -> ApiResult<Json<PitchListResponse>> {
    let pitches = state.pitches.list(query.category.as_deref()).await?;

    let ids: Vec<i64> = pitches
        .iter()
        .filter_map(|p| p.user_id.parse::<i64>().ok())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let uploaders = state.users.uploaders_by_ids(&ids).await?;

    let mut minted = 0;
    let items: Vec<PitchListItem> = pitches
        .into_iter()
        .map(|pitch| {
            let uploader = pitch
                .user_id
                .parse::<i64>()
                .ok()
                .and_then(|id| uploaders.get(&id).cloned())
                .unwrap_or_else(|| Uploader::unknown(pitch.user_id.clone()));
            let url = fresh_url(&state, &pitch);
            if url.is_some() {
                minted += 1;
            }
            PitchListItem::from_pitch(pitch, uploader, url)
        })
        .collect();

    metrics::record_urls_minted(Container::Pitches.as_str(), minted);

    Ok(Json(PitchListResponse { pitches: items }))
}

/// Delete a pitch record. Any signed-in user may remove a listing; the
/// stored file is kept.
pub async fn delete_pitch(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = PitchId::from(id);
    let pitch = state
        .pitches
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Pitch not found"))?;

    state.pitches.delete(&id).await?;

    info!(
        pitch_id = %id,
        owner = %pitch.user_id,
        deleted_by = user.id,
        "Pitch deleted"
    );

    Ok(Json(MessageResponse {
        message: "Pitch deleted successfully".to_string(),
    }))
}

/// Object key of a pitch: the stored file name, else recovered from its URL.
fn pitch_key(pitch: &Pitch) -> Option<String> {
    pitch
        .file_name
        .clone()
        .filter(|n| !n.is_empty())
        .or_else(|| pitch.file_url.as_deref().and_then(object_key_from_url))
}

/// Mint a read URL for the pitch. `None` if no usable key is known.
fn fresh_url(state: &AppState, pitch: &Pitch) -> Option<String> {
    let key = pitch_key(pitch)?;
    match state.signer().issue(&key, Container::Pitches) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(pitch_id = %pitch.id, error = %e, "Could not mint pitch URL");
            None
        }
    }
}
