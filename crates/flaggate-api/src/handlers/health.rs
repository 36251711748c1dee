//! Liveness endpoint for orchestration probes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use tracing::{debug, instrument};

/// Service name reported by the liveness probe.
pub const SERVICE_NAME: &str = "flaggate";

/// Liveness check endpoint.
///
/// Returns a simple response indicating the service process is alive. The
/// gate has no external dependencies, so this is the only health signal.
#[instrument(name = "liveness_check")]
pub async fn liveness_check() -> Response {
    debug!("Performing liveness check");

    let response = serde_json::json!({
        "status": "alive",
        "timestamp": Utc::now(),
        "service": SERVICE_NAME
    });

    (StatusCode::OK, Json(response)).into_response()
}
