//! API routes.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::error::ApiError;
use crate::handlers::{
    delete_my_profile, delete_pitch, get_my_profile, get_public_profile, health, hello,
    latest_pitch, list_pitches, login, ready, register, sql_health, update_my_profile,
    upload_pitch, upload_profile_photo, view_file,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Requests per second allowed per IP on credential endpoints.
const AUTH_RATE_LIMIT_RPS: u32 = 5;

async fn api_not_found() -> ApiError {
    ApiError::not_found("API endpoint not found")
}

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));
    let auth_rate_limiter = Arc::new(RateLimiterCache::new(AUTH_RATE_LIMIT_RPS));

    let auth_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .layer(middleware::from_fn_with_state(
            auth_rate_limiter,
            rate_limit_middleware,
        ));

    let pitch_routes = Router::new()
        .route("/pitches", get(list_pitches))
        .route("/pitches/:id", delete(delete_pitch))
        .route("/view-file", get(view_file));

    let profile_routes = Router::new()
        .route(
            "/profile",
            get(get_my_profile)
                .put(update_my_profile)
                .delete(delete_my_profile),
        )
        .route("/profile/photo", post(upload_profile_photo))
        .route("/profiles/:user_id", get(get_public_profile));

    let api_routes = Router::new()
        .merge(pitch_routes)
        .merge(profile_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .merge(auth_routes)
        .route("/sql-health", get(sql_health))
        .fallback(api_not_found);

    // Root-level paths used by the existing web client
    let legacy_routes = Router::new()
        .route("/upload", post(upload_pitch))
        .route("/latest-pitch/:category", get(latest_pitch))
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/hello", get(hello))
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(legacy_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        // Uploads are bounded by the layer below instead of the extractor default
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
