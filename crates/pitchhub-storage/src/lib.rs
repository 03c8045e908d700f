//! Azure Blob storage client.
//!
//! This crate provides:
//! - Capability URLs (service SAS) for read access to stored objects
//! - Single-shot blob uploads with inline content headers
//! - Content-type resolution from file extensions
//! - A proxy-friendly fetch for URLs on the configured account

pub mod client;
pub mod config;
pub mod content_type;
pub mod error;
pub mod sas;
pub mod writer;

pub use client::{AzureBlobClient, FetchedBlob};
pub use config::{Container, ContainerNames, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use sas::{object_key_from_url, validate_object_key, SasPermissions, SasSigner};
pub use writer::{BlobBackend, BlobHeaders, BlobWriter};
