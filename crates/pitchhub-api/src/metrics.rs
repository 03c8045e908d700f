//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;

/// Install the Prometheus recorder and return its render handle.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names.
pub mod names {
    // HTTP
    pub const HTTP_REQUESTS_TOTAL: &str = "pitchhub_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "pitchhub_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "pitchhub_http_requests_in_flight";

    // Blob storage
    pub const BLOB_UPLOADS_TOTAL: &str = "pitchhub_blob_uploads_total";
    pub const BLOB_UPLOAD_DURATION_SECONDS: &str = "pitchhub_blob_upload_duration_seconds";
    pub const BLOB_UPLOAD_BYTES: &str = "pitchhub_blob_upload_bytes";
    pub const SAS_URLS_MINTED_TOTAL: &str = "pitchhub_sas_urls_minted_total";

    // Accounts
    pub const REGISTRATIONS_TOTAL: &str = "pitchhub_registrations_total";
    pub const LOGINS_TOTAL: &str = "pitchhub_logins_total";

    pub const RATE_LIMIT_HITS_TOTAL: &str = "pitchhub_rate_limit_hits_total";
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a blob write attempt.
pub fn record_blob_upload(container: &str, success: bool, bytes: usize, duration_secs: f64) {
    let labels = [
        ("container", container.to_string()),
        ("result", if success { "ok" } else { "error" }.to_string()),
    ];
    counter!(names::BLOB_UPLOADS_TOTAL, &labels).increment(1);
    histogram!(names::BLOB_UPLOAD_DURATION_SECONDS, &labels).record(duration_secs);
    if success {
        histogram!(names::BLOB_UPLOAD_BYTES, "container" => container.to_string())
            .record(bytes as f64);
    }
}

/// Record read URLs minted for `container`.
pub fn record_urls_minted(container: &str, count: u64) {
    counter!(names::SAS_URLS_MINTED_TOTAL, "container" => container.to_string()).increment(count);
}

pub fn record_registration(user_type: &str) {
    counter!(names::REGISTRATIONS_TOTAL, "user_type" => user_type.to_string()).increment(1);
}

pub fn record_login(success: bool) {
    let result = if success { "ok" } else { "rejected" };
    counter!(names::LOGINS_TOTAL, "result" => result).increment(1);
}

pub fn record_rate_limit_hit(endpoint: &str) {
    counter!(names::RATE_LIMIT_HITS_TOTAL, "endpoint" => sanitize_path(endpoint)).increment(1);
}

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});
static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/[0-9]+(/|$)").unwrap());
static CATEGORY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/latest-pitch/[^/]+").unwrap());
static PITCH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/api/pitches/[^/]+").unwrap());
static PROFILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/api/profiles/[^/]+").unwrap());

/// Collapse path parameters so label cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    let path = UUID_RE.replace_all(path, ":id");
    let path = NUMERIC_RE.replace_all(&path, "/:id$1");
    let path = CATEGORY_RE.replace(&path, "/latest-pitch/:category");
    let path = PITCH_RE.replace(&path, "/api/pitches/:id");
    let path = PROFILE_RE.replace(&path, "/api/profiles/:user_id");
    path.into_owned()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/pitches/550e8400-e29b-41d4-a716-446655440000"),
            "/api/pitches/:id"
        );
        assert_eq!(sanitize_path("/api/profiles/42"), "/api/profiles/:user_id");
        assert_eq!(
            sanitize_path("/latest-pitch/Music%20Videos"),
            "/latest-pitch/:category"
        );
        assert_eq!(sanitize_path("/api/pitches"), "/api/pitches");
        assert_eq!(sanitize_path("/hello"), "/hello");
    }
}
