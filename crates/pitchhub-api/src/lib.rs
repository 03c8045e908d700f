//! Axum HTTP API server for PitchHub.
//!
//! This crate provides:
//! - Account registration and login backed by Postgres
//! - Pitch and profile records in Firestore, files in Azure Blob storage
//! - Rate limiting, security headers and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod services;
pub mod state;

pub use config::{ApiConfig, DatabaseConfig, JwtConfig};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{UserService, UserStore};
pub use state::AppState;
