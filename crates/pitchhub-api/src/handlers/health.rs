//! Health check handlers.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::error;

use pitchhub_storage::Container;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Serialize)]
pub struct HelloResponse {
    pub message: String,
}

/// Greeting kept for existing uptime checks.
pub async fn hello() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello! Server is healthy ✅".to_string(),
    })
}

#[derive(Serialize)]
pub struct SqlHealthResponse {
    pub status: String,
    pub message: String,
}

/// Relational store round trip.
pub async fn sql_health(State(state): State<AppState>) -> (StatusCode, Json<SqlHealthResponse>) {
    match state.users.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(SqlHealthResponse {
                status: "ok".to_string(),
                message: "SQL connection successful".to_string(),
            }),
        ),
        Err(e) => {
            error!(error = %e, "SQL health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SqlHealthResponse {
                    status: "error".to_string(),
                    message: "SQL connection failed".to_string(),
                }),
            )
        }
    }
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub database: CheckStatus,
    pub firestore: CheckStatus,
    pub storage: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn from_result<E: std::fmt::Display>(result: Result<(), E>, start: Instant) -> Self {
        match result {
            Ok(()) => Self {
                status: "ok".to_string(),
                error: None,
                latency_ms: Some(start.elapsed().as_millis() as u64),
            },
            Err(e) => Self {
                status: "error".to_string(),
                error: Some(e.to_string()),
                latency_ms: None,
            },
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Readiness probe: database, document store and blob container.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let database = {
        let start = Instant::now();
        CheckStatus::from_result(state.users.ping().await, start)
    };

    // A missing document still proves the store answered
    let firestore = {
        let start = Instant::now();
        let result = state
            .firestore
            .get_document("_health", "_check")
            .await
            .map(|_| ());
        CheckStatus::from_result(result, start)
    };

    let storage = {
        let start = Instant::now();
        CheckStatus::from_result(
            state.blobs.check_connectivity(Container::Pitches).await,
            start,
        )
    };

    let all_ok = database.is_ok() && firestore.is_ok() && storage.is_ok();
    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks: ReadinessChecks {
            database,
            firestore,
            storage,
        },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
