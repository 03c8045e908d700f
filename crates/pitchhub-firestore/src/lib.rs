//! Firestore REST API client.
//!
//! This crate provides:
//! - A REST client with service-account or emulator authentication
//! - Structured queries (filter, order, limit)
//! - Typed repositories for pitches and profiles

pub mod client;
pub mod error;
pub mod metrics;
pub mod pitch_repo;
pub mod profile_repo;
pub mod types;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use pitch_repo::{PitchRepository, ALL_CATEGORIES, PITCHES_COLLECTION};
pub use profile_repo::{ProfileRepository, PROFILES_COLLECTION};
pub use types::{Document, FromFirestoreValue, StructuredQuery, ToFirestoreValue, Value};
