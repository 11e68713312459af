//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use store::Datastore;

use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// GET /health: reports process and datastore health.
pub async fn check<S: Datastore>(
    State(state): State<Arc<AppState<S>>>,
) -> (StatusCode, Json<HealthResponse>) {
    let (status, database, code) = match state.store.ping().await {
        Ok(()) => ("ok", "connected", StatusCode::OK),
        Err(e) => {
            tracing::warn!(error = %e, "health check could not reach the datastore");
            ("degraded", "disconnected", StatusCode::SERVICE_UNAVAILABLE)
        }
    };

    (
        code,
        Json(HealthResponse {
            status,
            database,
            timestamp: Utc::now(),
        }),
    )
}
