//! Input validation and sanitization for user-supplied values.
//!
//! This module provides:
//! - Proxy URL checks (only objects on the configured blob account)
//! - Upload filename sanitization
//! - Free-text field sanitization

use url::Url;

use pitchhub_storage::AzureBlobClient;

/// Maximum URL length accepted by the file proxy.
pub const MAX_URL_LENGTH: usize = 4096;

/// Maximum stored filename length.
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Maximum note length.
pub const MAX_NOTE_LENGTH: usize = 2000;

/// Maximum category length.
pub const MAX_CATEGORY_LENGTH: usize = 100;

/// Result of proxy URL validation.
#[derive(Debug, PartialEq, Eq)]
pub enum UrlValidationResult {
    Valid(String),
    Invalid(String),
    /// Parsed fine but points outside the blob account.
    HostNotAllowed(String),
    TooLong,
}

impl UrlValidationResult {
    pub fn into_result(self) -> Result<String, String> {
        match self {
            Self::Valid(url) => Ok(url),
            Self::Invalid(msg) => Err(msg),
            Self::HostNotAllowed(host) => Err(format!("Host '{}' is not allowed", host)),
            Self::TooLong => Err(format!(
                "URL exceeds maximum length of {} characters",
                MAX_URL_LENGTH
            )),
        }
    }
}

/// Validate a URL handed to the file proxy.
///
/// Only http(s) URLs addressing the configured blob account pass, so the
/// proxy cannot be pointed at arbitrary hosts.
pub fn validate_view_url(url: &str, blobs: &AzureBlobClient) -> UrlValidationResult {
    if url.len() > MAX_URL_LENGTH {
        return UrlValidationResult::TooLong;
    }

    let url = url.trim();
    if url.is_empty() {
        return UrlValidationResult::Invalid("URL cannot be empty".to_string());
    }

    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => return UrlValidationResult::Invalid(format!("Invalid URL format: {}", e)),
    };

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return UrlValidationResult::Invalid(format!(
                "Invalid protocol '{}'. Only HTTP and HTTPS are allowed.",
                scheme
            ))
        }
    }

    if !blobs.is_own_url(url) {
        return UrlValidationResult::HostNotAllowed(
            parsed.host_str().unwrap_or_default().to_string(),
        );
    }

    UrlValidationResult::Valid(url.to_string())
}

/// Reduce a client-supplied filename to a safe object key segment.
///
/// Directory components are dropped, control characters removed and the
/// result truncated. Returns `None` if nothing usable is left.
pub fn sanitize_filename(input: &str) -> Option<String> {
    let base = input
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(input)
        .trim();

    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_FILENAME_LENGTH)
        .collect();
    let cleaned = cleaned.trim();

    match cleaned {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}

/// Strip control characters (newlines and tabs kept) and cap the length.
pub fn sanitize_text(input: &str, max_len: usize) -> String {
    input
        .trim()
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .take(max_len)
        .collect()
}
