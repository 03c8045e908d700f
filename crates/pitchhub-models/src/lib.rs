//! Shared data models for the PitchHub backend.
//!
//! This crate provides Serde-serializable types for:
//! - Users and account types (talent / recruiter)
//! - Pitch records and their list views
//! - Talent profiles and profile updates

pub mod pitch;
pub mod profile;
pub mod user;

// Re-export common types
pub use pitch::{Pitch, PitchId, PitchListItem, Uploader};
pub use profile::{Profile, ProfileUpdate, ProfileView};
pub use user::{LoginRequest, RegisterRequest, UserPublic, UserType};
