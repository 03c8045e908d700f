//! Multipart upload parsing and blob writes shared by upload routes.

use std::collections::HashMap;
use std::time::Instant;

use axum::extract::Multipart;
use tracing::warn;

use pitchhub_storage::Container;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// File part of a multipart form.
pub(crate) struct UploadedFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Parsed multipart form: the `file` part plus every text field.
pub(crate) struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    /// Drain `multipart`. Later parts with the same name win.
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = UploadForm {
            file: None,
            fields: HashMap::new(),
        };

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == "file" {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?;
                form.file = Some(UploadedFile {
                    file_name,
                    data: data.to_vec(),
                });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid field '{}': {}", name, e)))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Non-blank text field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

/// Write `data` to `container` under `key` and return a read URL.
pub(crate) async fn store_blob(
    state: &AppState,
    data: Vec<u8>,
    key: &str,
    container: Container,
) -> ApiResult<String> {
    let size = data.len();
    let start = Instant::now();
    let result = state.writer.store(data, key, container).await;
    let elapsed = start.elapsed().as_secs_f64();

    metrics::record_blob_upload(container.as_str(), result.is_ok(), size, elapsed);
    match result {
        Ok(url) => {
            metrics::record_urls_minted(container.as_str(), 1);
            Ok(url)
        }
        Err(e) => {
            warn!(key = %key, container = %container, error = %e, "Blob upload failed");
            Err(e.into())
        }
    }
}
