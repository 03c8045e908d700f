//! Application state.

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use pitchhub_firestore::{FirestoreClient, PitchRepository, ProfileRepository};
use pitchhub_storage::{AzureBlobClient, BlobWriter, SasSigner};

use crate::auth::JwtKeys;
use crate::config::{ApiConfig, DatabaseConfig, JwtConfig};
use crate::services::{UserService, UserStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub users: Arc<dyn UserStore>,
    pub firestore: FirestoreClient,
    pub pitches: PitchRepository,
    pub profiles: ProfileRepository,
    pub blobs: Arc<AzureBlobClient>,
    pub writer: BlobWriter,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    /// Create application state from the environment, connecting to every backend.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let jwt = JwtConfig::from_env()?;
        let db = DatabaseConfig::from_env()?;

        let pool = PgPoolOptions::new()
            .max_connections(db.max_connections)
            .connect(&db.url)
            .await
            .context("Failed to connect to database")?;
        info!(max_connections = db.max_connections, "Database pool ready");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations applied");

        let firestore = FirestoreClient::from_env()
            .await
            .context("Failed to create Firestore client")?;
        let blobs = AzureBlobClient::from_env().context("Failed to create blob client")?;

        Ok(Self::from_parts(
            config,
            Arc::new(UserService::new(pool)),
            firestore,
            blobs,
            &jwt,
        ))
    }

    /// Assemble state from already constructed clients.
    pub fn from_parts(
        config: ApiConfig,
        users: Arc<dyn UserStore>,
        firestore: FirestoreClient,
        blobs: AzureBlobClient,
        jwt: &JwtConfig,
    ) -> Self {
        let blobs = Arc::new(blobs);
        let writer = BlobWriter::new(blobs.clone(), blobs.signer().clone());

        Self {
            config,
            users,
            pitches: PitchRepository::new(firestore.clone()),
            profiles: ProfileRepository::new(firestore.clone()),
            firestore,
            blobs,
            writer,
            jwt: Arc::new(JwtKeys::new(jwt)),
        }
    }

    /// Signer shared by the writer and every read-URL mint.
    pub fn signer(&self) -> &SasSigner {
        self.writer.signer()
    }
}
