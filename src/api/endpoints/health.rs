//! Liveness check.

use axum::Json;

use crate::api::types::HealthResponse;
use crate::config::{APP_NAME, APP_VERSION};

/// `GET /health`: static ready signal.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        service: APP_NAME,
        version: APP_VERSION,
    })
}
