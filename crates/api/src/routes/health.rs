//! Liveness endpoint.

use axum::Json;

use crate::response::HealthResponse;

/// GET /health - Process is up. Dependencies are not probed.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
