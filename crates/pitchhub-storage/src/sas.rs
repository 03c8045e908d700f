//! Capability URLs for stored objects (Azure service SAS).
//!
//! A capability URL is the canonical object address plus a signed query
//! string granting a permission for a bounded window. URLs are derived from
//! the stable object key and never persisted: callers mint a new one on
//! every read. Minting is a pure computation and performs no network call.

use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use crate::config::{Container, ContainerNames, StorageConfig};
use crate::error::{StorageError, StorageResult};

type HmacSha256 = Hmac<Sha256>;

/// Service version the signature format follows.
pub const SAS_VERSION: &str = "2022-11-02";

/// Validity of the write grant used to authorize uploads (15 minutes).
pub const WRITE_GRANT_SECS: i64 = 15 * 60;

/// Maximum object key length accepted by the blob service.
const MAX_KEY_LENGTH: usize = 1024;

/// Permission scope encoded into a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SasPermissions {
    /// Read the object.
    Read,
    /// Create or overwrite the object.
    CreateWrite,
}

impl SasPermissions {
    pub fn as_str(&self) -> &'static str {
        match self {
            SasPermissions::Read => "r",
            SasPermissions::CreateWrite => "cw",
        }
    }
}

/// Check that `key` is usable as an object name.
pub fn validate_object_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::invalid_key("key is empty"));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(StorageError::invalid_key(format!(
            "key exceeds {} characters",
            MAX_KEY_LENGTH
        )));
    }
    if key.chars().any(|c| c.is_control() || c == '\\') {
        return Err(StorageError::invalid_key(format!(
            "key contains forbidden characters: {:?}",
            key
        )));
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::invalid_key(format!(
            "key has an empty or relative path segment: {:?}",
            key
        )));
    }
    Ok(())
}

/// Recover an object key from a previously issued URL.
///
/// Takes the last path segment, drops the query string and percent-decodes
/// it. Only meaningful for keys without `/`.
pub fn object_key_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next()?;
    let segment = without_query.rsplit('/').next()?;
    if segment.is_empty() {
        return None;
    }
    urlencoding::decode(segment).ok().map(|s| s.into_owned())
}

/// Percent-encode each path segment of a key, keeping `/` separators.
fn encode_key_path(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn format_sas_time(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Signed fields of one grant.
struct SasGrant<'a> {
    permissions: SasPermissions,
    start: String,
    expiry: String,
    canonical_resource: String,
    protocol: &'a str,
}

impl SasGrant<'_> {
    fn string_to_sign(&self) -> String {
        // permissions, start, expiry, resource, identifier, ip, protocol, version,
        // resource type, snapshot time, encryption scope, rscc, rscd, rsce, rscl, rsct
        [
            self.permissions.as_str(),
            &self.start,
            &self.expiry,
            &self.canonical_resource,
            "",
            "",
            self.protocol,
            SAS_VERSION,
            "b",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
        ]
        .join("\n")
    }
}

/// Capability-URL issuer.
///
/// Holds the decoded account key. Construct once at startup and share.
#[derive(Clone)]
pub struct SasSigner {
    account_name: String,
    key: Arc<[u8]>,
    endpoint: String,
    containers: ContainerNames,
    validity: ChronoDuration,
    clock_skew: ChronoDuration,
}

impl fmt::Debug for SasSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SasSigner")
            .field("account_name", &self.account_name)
            .field("endpoint", &self.endpoint)
            .field("containers", &self.containers)
            .field("validity", &self.validity)
            .field("clock_skew", &self.clock_skew)
            .finish_non_exhaustive()
    }
}

impl SasSigner {
    /// Build a signer from account configuration.
    ///
    /// Fails with [`StorageError::ConfigError`] when the account name or key is
    /// absent, or the key is not valid base64.
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        config.validate()?;

        let key = STANDARD
            .decode(config.account_key.trim())
            .map_err(|e| StorageError::config_error(format!("Account key is not base64: {}", e)))?;
        if key.is_empty() {
            return Err(StorageError::config_error("Account key decodes to zero bytes"));
        }

        let validity = ChronoDuration::from_std(config.sas_validity)
            .map_err(|e| StorageError::config_error(format!("Invalid SAS validity: {}", e)))?;
        let clock_skew = ChronoDuration::from_std(config.sas_clock_skew)
            .map_err(|e| StorageError::config_error(format!("Invalid SAS clock skew: {}", e)))?;

        Ok(Self {
            account_name: config.account_name.clone(),
            key: Arc::from(key),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            containers: config.containers.clone(),
            validity,
            clock_skew,
        })
    }

    /// Blob service endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Configured name of a logical container.
    pub fn container_name(&self, container: Container) -> &str {
        self.containers.name(container)
    }

    /// Canonical (unsigned) address of an object.
    pub fn object_url(&self, key: &str, container: Container) -> StorageResult<String> {
        validate_object_key(key)?;
        Ok(format!(
            "{}/{}/{}",
            self.endpoint,
            self.container_name(container),
            encode_key_path(key)
        ))
    }

    /// Mint a read URL for `key` valid from now (minus clock skew) for the configured period.
    pub fn issue(&self, key: &str, container: Container) -> StorageResult<String> {
        self.issue_at(key, container, Utc::now())
    }

    /// Mint a read URL as of `now`.
    pub fn issue_at(
        &self,
        key: &str,
        container: Container,
        now: DateTime<Utc>,
    ) -> StorageResult<String> {
        let url = self.sign_url(
            key,
            container,
            SasPermissions::Read,
            now - self.clock_skew,
            now + self.validity,
        )?;
        debug!(key = %key, container = %container, "Minted read URL");
        Ok(url)
    }

    /// Mint a short-lived create/write URL used to authorize an upload.
    pub fn issue_write_at(
        &self,
        key: &str,
        container: Container,
        now: DateTime<Utc>,
    ) -> StorageResult<String> {
        self.sign_url(
            key,
            container,
            SasPermissions::CreateWrite,
            now - self.clock_skew,
            now + ChronoDuration::seconds(WRITE_GRANT_SECS),
        )
    }

    /// Mint a read URL for the container probe used by readiness checks.
    pub(crate) fn issue_probe_at(&self, container: Container, now: DateTime<Utc>) -> StorageResult<String> {
        self.sign_url(
            ".readiness-probe",
            container,
            SasPermissions::Read,
            now - self.clock_skew,
            now + ChronoDuration::seconds(WRITE_GRANT_SECS),
        )
    }

    fn sign_url(
        &self,
        key: &str,
        container: Container,
        permissions: SasPermissions,
        start: DateTime<Utc>,
        expiry: DateTime<Utc>,
    ) -> StorageResult<String> {
        let base = self.object_url(key, container)?;
        let container_name = self.container_name(container);

        let grant = SasGrant {
            permissions,
            start: format_sas_time(start),
            expiry: format_sas_time(expiry),
            canonical_resource: format!("/blob/{}/{}/{}", self.account_name, container_name, key),
            protocol: self.signed_protocol(),
        };
        let signature = self.sign(&grant.string_to_sign())?;

        Ok(format!(
            "{}?sv={}&spr={}&st={}&se={}&sr=b&sp={}&sig={}",
            base,
            SAS_VERSION,
            urlencoding::encode(grant.protocol),
            urlencoding::encode(&grant.start),
            urlencoding::encode(&grant.expiry),
            grant.permissions.as_str(),
            urlencoding::encode(&signature),
        ))
    }

    /// Plain-HTTP endpoints (emulators) must allow both protocols.
    fn signed_protocol(&self) -> &'static str {
        if self.endpoint.starts_with("https://") {
            "https"
        } else {
            "https,http"
        }
    }

    fn sign(&self, string_to_sign: &str) -> StorageResult<String> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| StorageError::config_error(format!("Invalid HMAC key: {}", e)))?;
        mac.update(string_to_sign.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn signer() -> SasSigner {
        // "devkey-0123456789" base64-encoded
        SasSigner::new(&StorageConfig::new("pitchacct", "ZGV2a2V5LTAxMjM0NTY3ODk=")).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn split(url: &str) -> (&str, &str) {
        url.split_once('?').unwrap()
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let err = SasSigner::new(&StorageConfig::new("pitchacct", "")).unwrap_err();
        assert!(err.is_config_error());

        let err = SasSigner::new(&StorageConfig::new("", "ZGV2a2V5")).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_non_base64_key_is_config_error() {
        let err = SasSigner::new(&StorageConfig::new("pitchacct", "not base64!!")).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_issue_shape() {
        let url = signer().issue_at("deck.pdf", Container::Pitches, t0()).unwrap();
        let (base, query) = split(&url);
        assert_eq!(base, "https://pitchacct.blob.core.windows.net/pitches/deck.pdf");
        assert!(query.starts_with("sv=2022-11-02&spr=https&"));
        assert!(query.contains("st=2024-03-01T11%3A55%3A00Z"));
        assert!(query.contains("se=2025-03-01T12%3A00%3A00Z"));
        assert!(query.contains("&sr=b&sp=r&sig="));
    }

    #[test]
    fn test_known_signature() {
        let url = signer().issue_at("deck.pdf", Container::Pitches, t0()).unwrap();
        let sig = url.rsplit_once("sig=").unwrap().1;
        assert_eq!(
            urlencoding::decode(sig).unwrap(),
            "YU3YWhhdfKFyx7aDJi8BQYx/8SF0xJFTj1yT4rg8erk="
        );
    }

    #[test]
    fn test_one_second_apart_same_path_different_signature() {
        let s = signer();
        let a = s.issue_at("a.png", Container::Pitches, t0()).unwrap();
        let b = s
            .issue_at("a.png", Container::Pitches, t0() + ChronoDuration::seconds(1))
            .unwrap();
        assert_eq!(split(&a).0, split(&b).0);
        assert_ne!(a.rsplit_once("sig=").unwrap().1, b.rsplit_once("sig=").unwrap().1);
    }

    #[test]
    fn test_same_instant_is_deterministic() {
        let s = signer();
        assert_eq!(
            s.issue_at("a.png", Container::Pitches, t0()).unwrap(),
            s.issue_at("a.png", Container::Pitches, t0()).unwrap()
        );
    }

    #[test]
    fn test_container_changes_path_and_signature() {
        let s = signer();
        let a = s.issue_at("a.png", Container::Pitches, t0()).unwrap();
        let b = s.issue_at("a.png", Container::Profiles, t0()).unwrap();
        assert!(split(&b).0.ends_with("/profiles/a.png"));
        assert_ne!(a.rsplit_once("sig=").unwrap().1, b.rsplit_once("sig=").unwrap().1);
    }

    #[test]
    fn test_key_is_case_sensitive_and_encoded() {
        let s = signer();
        let url = s.issue_at("My Pitch #1.PDF", Container::Pitches, t0()).unwrap();
        assert!(split(&url).0.ends_with("/pitches/My%20Pitch%20%231.PDF"));

        let nested = s.issue_at("42/head shot.png", Container::Profiles, t0()).unwrap();
        assert!(split(&nested).0.ends_with("/profiles/42/head%20shot.png"));
    }

    #[test]
    fn test_write_grant() {
        let url = signer().issue_write_at("a.png", Container::Pitches, t0()).unwrap();
        assert!(url.contains("&sp=cw&"));
        assert!(url.contains("se=2024-03-01T12%3A15%3A00Z"));
    }

    #[test]
    fn test_http_endpoint_allows_both_protocols() {
        let config = StorageConfig::new("devstoreaccount1", "ZGV2a2V5")
            .with_endpoint("http://127.0.0.1:10000/devstoreaccount1/");
        let url = SasSigner::new(&config)
            .unwrap()
            .issue_at("a.png", Container::Pitches, t0())
            .unwrap();
        assert!(url.starts_with("http://127.0.0.1:10000/devstoreaccount1/pitches/a.png?"));
        assert!(url.contains("spr=https%2Chttp"));
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let s = signer();
        for key in ["", "../etc/passwd", "a//b", "a\\b", "bad\nkey", "trailing/"] {
            assert!(
                matches!(
                    s.issue_at(key, Container::Pitches, t0()),
                    Err(StorageError::InvalidKey(_))
                ),
                "{:?} should be rejected",
                key
            );
        }
    }

    #[test]
    fn test_object_key_from_url() {
        let s = signer();
        let url = s.issue_at("My Pitch.pdf", Container::Pitches, t0()).unwrap();
        assert_eq!(object_key_from_url(&url).as_deref(), Some("My Pitch.pdf"));
        assert_eq!(
            object_key_from_url("https://x.blob.core.windows.net/pitches/deck.pdf").as_deref(),
            Some("deck.pdf")
        );
        assert_eq!(object_key_from_url("https://x/pitches/"), None);
    }
}
