//! Health and readiness endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /system/health (also aliased at the API root as /health)
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "environment": state.config.env,
        "timestamp": Utc::now(),
    }))
}

/// GET /system/readiness
///
/// Probes the document store; a backing file that cannot be read means
/// the service is up but not able to serve data.
pub async fn readiness(State(state): State<Arc<AppState>>) -> Response {
    match state.projects.list().await {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ready" }))).into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "readiness probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded" })),
            )
                .into_response()
        }
    }
}
