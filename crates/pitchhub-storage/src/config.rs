//! Storage account configuration.

use std::fmt;
use std::time::Duration;

use crate::error::{StorageError, StorageResult};

/// Default read-grant validity (365 days).
pub const DEFAULT_SAS_VALIDITY_SECS: u64 = 365 * 24 * 60 * 60;

/// Default clock-skew allowance applied to the start of a grant (5 minutes).
pub const DEFAULT_SAS_SKEW_SECS: u64 = 5 * 60;

/// Default pitches container name.
pub const DEFAULT_PITCHES_CONTAINER: &str = "pitches";

/// Default profiles container name.
pub const DEFAULT_PROFILES_CONTAINER: &str = "profiles";

/// Known object containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    /// Pitch decks, videos and documents uploaded by talent.
    Pitches,
    /// Profile photos.
    Profiles,
}

impl Container {
    pub fn as_str(&self) -> &'static str {
        match self {
            Container::Pitches => "pitches",
            Container::Profiles => "profiles",
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical container names for each logical container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerNames {
    pub pitches: String,
    pub profiles: String,
}

impl Default for ContainerNames {
    fn default() -> Self {
        Self {
            pitches: DEFAULT_PITCHES_CONTAINER.to_string(),
            profiles: DEFAULT_PROFILES_CONTAINER.to_string(),
        }
    }
}

impl ContainerNames {
    /// Resolve a logical container to its configured name.
    pub fn name(&self, container: Container) -> &str {
        match container {
            Container::Pitches => &self.pitches,
            Container::Profiles => &self.profiles,
        }
    }

    fn validate(&self) -> StorageResult<()> {
        for name in [&self.pitches, &self.profiles] {
            if !is_valid_container_name(name) {
                return Err(StorageError::config_error(format!(
                    "Invalid container name '{}'",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Azure container names: 3-63 chars, lowercase letters, digits and single hyphens,
/// starting and ending with a letter or digit.
fn is_valid_container_name(name: &str) -> bool {
    let len = name.len();
    if !(3..=63).contains(&len) || name.contains("--") {
        return false;
    }
    let alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    name.starts_with(alnum)
        && name.ends_with(alnum)
        && name.chars().all(|c| alnum(c) || c == '-')
}

/// Configuration for the blob storage account.
#[derive(Clone)]
pub struct StorageConfig {
    /// Storage account name
    pub account_name: String,
    /// Base64-encoded shared account key
    pub account_key: String,
    /// Blob service endpoint (no trailing slash)
    pub endpoint: String,
    /// Container names
    pub containers: ContainerNames,
    /// How long read grants stay valid
    pub sas_validity: Duration,
    /// Clock-skew allowance subtracted from the grant start
    pub sas_clock_skew: Duration,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("containers", &self.containers)
            .field("sas_validity", &self.sas_validity)
            .field("sas_clock_skew", &self.sas_clock_skew)
            .finish()
    }
}

impl StorageConfig {
    /// Config for an account on the public Azure endpoint with default containers and grant window.
    pub fn new(account_name: impl Into<String>, account_key: impl Into<String>) -> Self {
        let account_name = account_name.into();
        Self {
            endpoint: default_endpoint(&account_name),
            account_name,
            account_key: account_key.into(),
            containers: ContainerNames::default(),
            sas_validity: Duration::from_secs(DEFAULT_SAS_VALIDITY_SECS),
            sas_clock_skew: Duration::from_secs(DEFAULT_SAS_SKEW_SECS),
        }
    }

    /// Override the blob service endpoint (emulators, sovereign clouds, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let account_name = required_env("AZURE_STORAGE_ACCOUNT_NAME")?;
        let account_key = required_env("AZURE_STORAGE_ACCOUNT_KEY")?;

        let mut config = Self::new(account_name, account_key);

        if let Ok(endpoint) = std::env::var("AZURE_BLOB_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                config = config.with_endpoint(endpoint.trim());
            }
        }

        config.containers = ContainerNames {
            pitches: std::env::var("AZURE_CONTAINER_NAME")
                .unwrap_or_else(|_| DEFAULT_PITCHES_CONTAINER.to_string()),
            profiles: std::env::var("AZURE_PROFILES_CONTAINER")
                .unwrap_or_else(|_| DEFAULT_PROFILES_CONTAINER.to_string()),
        };

        config.sas_validity = Duration::from_secs(
            std::env::var("AZURE_SAS_VALIDITY_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SAS_VALIDITY_SECS),
        );
        config.sas_clock_skew = Duration::from_secs(
            std::env::var("AZURE_SAS_SKEW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SAS_SKEW_SECS),
        );

        config.validate()?;
        Ok(config)
    }

    /// Check that every required field is present and well-formed.
    pub fn validate(&self) -> StorageResult<()> {
        if self.account_name.trim().is_empty() {
            return Err(StorageError::config_error("Storage account name is empty"));
        }
        if self.account_key.trim().is_empty() {
            return Err(StorageError::config_error("Storage account key is empty"));
        }
        if self.endpoint.is_empty() {
            return Err(StorageError::config_error("Blob endpoint is empty"));
        }
        self.containers.validate()
    }
}

fn default_endpoint(account_name: &str) -> String {
    format!("https://{}.blob.core.windows.net", account_name)
}

fn required_env(name: &str) -> StorageResult<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(StorageError::config_error(format!("{} not set", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            "AZURE_STORAGE_ACCOUNT_NAME",
            "AZURE_STORAGE_ACCOUNT_KEY",
            "AZURE_BLOB_ENDPOINT",
            "AZURE_CONTAINER_NAME",
            "AZURE_PROFILES_CONTAINER",
            "AZURE_SAS_VALIDITY_SECS",
            "AZURE_SAS_SKEW_SECS",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_requires_account_key() {
        clear_env();
        std::env::set_var("AZURE_STORAGE_ACCOUNT_NAME", "pitchacct");
        let err = StorageConfig::from_env().unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("AZURE_STORAGE_ACCOUNT_KEY"));
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        std::env::set_var("AZURE_STORAGE_ACCOUNT_NAME", "pitchacct");
        std::env::set_var("AZURE_STORAGE_ACCOUNT_KEY", "c2VjcmV0");
        let config = StorageConfig::from_env().unwrap();
        assert_eq!(config.endpoint, "https://pitchacct.blob.core.windows.net");
        assert_eq!(config.containers.name(Container::Pitches), "pitches");
        assert_eq!(config.containers.name(Container::Profiles), "profiles");
        assert_eq!(config.sas_validity, Duration::from_secs(DEFAULT_SAS_VALIDITY_SECS));
        assert_eq!(config.sas_clock_skew, Duration::from_secs(300));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_container() {
        clear_env();
        std::env::set_var("AZURE_STORAGE_ACCOUNT_NAME", "pitchacct");
        std::env::set_var("AZURE_STORAGE_ACCOUNT_KEY", "c2VjcmV0");
        std::env::set_var("AZURE_CONTAINER_NAME", "Pitches_Old");
        assert!(StorageConfig::from_env().unwrap_err().is_config_error());
        clear_env();
    }

    #[test]
    fn test_container_name_rules() {
        assert!(is_valid_container_name("pitches"));
        assert!(is_valid_container_name("talent-2024"));
        assert!(!is_valid_container_name("ab"));
        assert!(!is_valid_container_name("-pitches"));
        assert!(!is_valid_container_name("pit--ches"));
        assert!(!is_valid_container_name("Pitches"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = StorageConfig::new("pitchacct", "c2VjcmV0");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("c2VjcmV0"));
        assert!(debug.contains("<redacted>"));
    }
}
