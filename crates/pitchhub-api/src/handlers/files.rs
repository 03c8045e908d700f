//! Same-origin proxy for stored objects.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use serde::Deserialize;
use tracing::warn;

use pitchhub_storage::StorageError;

use crate::error::{ApiError, ApiResult};
use crate::security::validate_view_url;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ViewFileQuery {
    pub url: Option<String>,
}

/// Stream an object from the blob account back to the browser for inline display.
pub async fn view_file(
    State(state): State<AppState>,
    Query(query): Query<ViewFileQuery>,
) -> ApiResult<Response> {
    let url = query
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("File URL is required"))?;

    let url = validate_view_url(&url, &state.blobs)
        .into_result()
        .map_err(ApiError::bad_request)?;

    let blob = state.blobs.fetch(&url).await.map_err(|e| match e {
        StorageError::NotFound(_) => ApiError::not_found("Failed to fetch file"),
        StorageError::Rejected { status, message } => {
            warn!(status, message = %message, "Store rejected file proxy fetch");
            ApiError::upstream(status, "Failed to fetch file")
        }
        other => {
            warn!(error = %other, "File proxy fetch failed");
            ApiError::from(other)
        }
    })?;

    let content_type = blob
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, "inline")
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .body(Body::from(blob.bytes))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}
