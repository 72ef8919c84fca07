//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use super::sales::{AppState, SalesStore};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub environment: String,
    pub version: &'static str,
}

/// GET /health: liveness check.
pub async fn check<S: SalesStore>(State(state): State<Arc<AppState<S>>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        environment: state.environment.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
