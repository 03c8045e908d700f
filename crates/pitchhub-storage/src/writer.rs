//! Object writer: store bytes, hand back a capability URL.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::Container;
use crate::content_type;
use crate::error::StorageResult;
use crate::sas::{validate_object_key, SasSigner};

/// Headers attached to every stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHeaders {
    pub content_type: &'static str,
    pub content_disposition: String,
}

impl BlobHeaders {
    /// Headers for `key`: MIME type from the extension, inline disposition
    /// naming the last key segment.
    pub fn for_key(key: &str) -> Self {
        let filename = key.rsplit('/').next().unwrap_or(key);
        Self {
            content_type: content_type::resolve(filename),
            content_disposition: inline_disposition(filename),
        }
    }
}

/// `inline; filename="..."`, with an RFC 6266 `filename*` for non-ASCII names.
fn inline_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    if filename.is_ascii() {
        format!("inline; filename=\"{}\"", ascii)
    } else {
        format!(
            "inline; filename=\"{}\"; filename*=UTF-8''{}",
            ascii,
            urlencoding::encode(filename)
        )
    }
}

/// Single-shot write to the object store.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Create or replace `key` in `container` with `data`.
    async fn put_blob(
        &self,
        container: Container,
        key: &str,
        data: Vec<u8>,
        headers: &BlobHeaders,
    ) -> StorageResult<()>;
}

/// Stores objects and returns freshly minted read URLs for them.
#[derive(Clone)]
pub struct BlobWriter {
    backend: Arc<dyn BlobBackend>,
    signer: SasSigner,
}

impl BlobWriter {
    pub fn new(backend: Arc<dyn BlobBackend>, signer: SasSigner) -> Self {
        Self { backend, signer }
    }

    /// Signer used for the returned URLs.
    pub fn signer(&self) -> &SasSigner {
        &self.signer
    }

    /// Write `data` under `key` in `container` and return a read URL for it.
    ///
    /// Existing objects are replaced. Errors from the backend are returned
    /// unchanged and no URL is produced.
    pub async fn store(
        &self,
        data: Vec<u8>,
        key: &str,
        container: Container,
    ) -> StorageResult<String> {
        validate_object_key(key)?;

        let headers = BlobHeaders::for_key(key);
        let size = data.len();
        debug!(
            key = %key,
            container = %container,
            content_type = headers.content_type,
            size,
            "Storing object"
        );

        let start = Instant::now();
        self.backend.put_blob(container, key, data, &headers).await?;
        let elapsed = start.elapsed();

        info!(
            key = %key,
            container = %container,
            size,
            duration_ms = elapsed.as_millis() as u64,
            "Stored object"
        );

        self.signer.issue(key, container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_for_key() {
        let headers = BlobHeaders::for_key("deck.PDF");
        assert_eq!(headers.content_type, "application/pdf");
        assert_eq!(headers.content_disposition, "inline; filename=\"deck.PDF\"");

        let nested = BlobHeaders::for_key("42/me.png");
        assert_eq!(nested.content_type, "image/png");
        assert_eq!(nested.content_disposition, "inline; filename=\"me.png\"");
    }

    #[test]
    fn test_disposition_escapes_quotes_and_non_ascii() {
        assert_eq!(
            inline_disposition("a\"b.txt"),
            "inline; filename=\"a_b.txt\""
        );
        assert_eq!(
            inline_disposition("résumé.pdf"),
            "inline; filename=\"r_sum_.pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"
        );
    }
}
