//! Azure Blob REST client.
//!
//! Every request is authorized by a SAS minted locally; the shared key is
//! never sent over the wire.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::config::{Container, StorageConfig};
use crate::error::{StorageError, StorageResult};
use crate::sas::{SasSigner, SAS_VERSION};
use crate::writer::{BlobBackend, BlobHeaders};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Object bytes and the content type reported by the store.
#[derive(Debug, Clone)]
pub struct FetchedBlob {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Blob service client bound to one storage account.
#[derive(Clone)]
pub struct AzureBlobClient {
    http: Client,
    signer: SasSigner,
    endpoint: Url,
}

impl AzureBlobClient {
    /// Create a client from account configuration.
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        let signer = SasSigner::new(config)?;
        Self::with_signer(signer)
    }

    /// Create a client around an existing signer.
    pub fn with_signer(signer: SasSigner) -> StorageResult<Self> {
        let endpoint = Url::parse(signer.endpoint()).map_err(|e| {
            StorageError::config_error(format!("Invalid blob endpoint '{}': {}", signer.endpoint(), e))
        })?;

        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| StorageError::config_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            signer,
            endpoint,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Self::new(&StorageConfig::from_env()?)
    }

    pub fn signer(&self) -> &SasSigner {
        &self.signer
    }

    /// True if `url` addresses an object on this account's endpoint.
    pub fn is_own_url(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let account_path = format!("{}/", self.endpoint.path().trim_end_matches('/'));
        parsed.scheme() == self.endpoint.scheme()
            && parsed.host_str() == self.endpoint.host_str()
            && parsed.port_or_known_default() == self.endpoint.port_or_known_default()
            && parsed.path().starts_with(&account_path)
    }

    /// Download an object through a capability URL issued for this account.
    pub async fn fetch(&self, url: &str) -> StorageResult<FetchedBlob> {
        if !self.is_own_url(url) {
            return Err(StorageError::ForeignUrl(url.to_string()));
        }

        debug!("Fetching object via capability URL");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| StorageError::download_failed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::not_found(url_path(url)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Object fetch rejected");
            return Err(StorageError::rejected(
                status.as_u16(),
                truncate(&body, 200),
            ));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::download_failed(e.to_string()))?;

        Ok(FetchedBlob {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    /// Check that the container answers authorized requests.
    ///
    /// A missing probe object (404) still proves the account and key are good.
    pub async fn check_connectivity(&self, container: Container) -> StorageResult<()> {
        let url = self.signer.issue_probe_at(container, Utc::now())?;

        let response = self
            .http
            .head(&url)
            .send()
            .await
            .map_err(|e| StorageError::Unreachable(e.to_string()))?;

        match response.status() {
            s if s.is_success() || s == StatusCode::NOT_FOUND => Ok(()),
            s => Err(StorageError::Unreachable(format!(
                "container '{}' answered HTTP {}",
                self.signer.container_name(container),
                s
            ))),
        }
    }
}

#[async_trait]
impl BlobBackend for AzureBlobClient {
    async fn put_blob(
        &self,
        container: Container,
        key: &str,
        data: Vec<u8>,
        headers: &BlobHeaders,
    ) -> StorageResult<()> {
        let url = self.signer.issue_write_at(key, container, Utc::now())?;

        let response = self
            .http
            .put(&url)
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-version", SAS_VERSION)
            .header("x-ms-blob-content-type", headers.content_type)
            .header(
                "x-ms-blob-content-disposition",
                headers.content_disposition.as_str(),
            )
            .header(header::CONTENT_TYPE, headers.content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::upload_failed(format!(
                "HTTP {}: {}",
                status,
                truncate(&body, 200)
            )));
        }
        Ok(())
    }
}

fn url_path(url: &str) -> String {
    url.split('?').next().unwrap_or(url).to_string()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AzureBlobClient {
        AzureBlobClient::new(&StorageConfig::new("pitchacct", "ZGV2a2V5")).unwrap()
    }

    #[test]
    fn test_is_own_url() {
        let c = client();
        assert!(c.is_own_url("https://pitchacct.blob.core.windows.net/pitches/a.png?sig=x"));
        assert!(!c.is_own_url("https://evil.example.com/pitches/a.png"));
        assert!(!c.is_own_url("http://pitchacct.blob.core.windows.net/pitches/a.png"));
        assert!(!c.is_own_url("not a url"));
    }

    #[test]
    fn test_is_own_url_respects_emulator_path() {
        let config = StorageConfig::new("devstoreaccount1", "ZGV2a2V5")
            .with_endpoint("http://127.0.0.1:10000/devstoreaccount1");
        let c = AzureBlobClient::new(&config).unwrap();
        assert!(c.is_own_url("http://127.0.0.1:10000/devstoreaccount1/pitches/a.png"));
        assert!(!c.is_own_url("http://127.0.0.1:10000/other/pitches/a.png"));
        assert!(!c.is_own_url("http://127.0.0.1:10000/devstoreaccount1evil/pitches/a.png"));
        assert!(!c.is_own_url("http://127.0.0.1:10000/devstoreaccount1"));
        assert!(!c.is_own_url("http://127.0.0.1:9999/devstoreaccount1/pitches/a.png"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_foreign_url() {
        let err = client().fetch("https://evil.example.com/x").await.unwrap_err();
        assert!(matches!(err, StorageError::ForeignUrl(_)));
    }

    #[test]
    fn test_truncate_char_boundary() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
