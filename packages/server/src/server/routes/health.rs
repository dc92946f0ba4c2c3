use axum::{extract::Extension, Json};
use serde::Serialize;

use crate::server::app::AxumAppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    cached_jobs: usize,
    active_traces: usize,
}

/// Health check endpoint
///
/// Reports the number of cached books and of clients currently watching a
/// trace. Always 200 while the process serves requests.
pub async fn health_handler(Extension(state): Extension<AxumAppState>) -> Json<HealthResponse> {
    let deps = &state.server_deps;

    Json(HealthResponse {
        status: "healthy".to_string(),
        cached_jobs: deps.cache.len().await,
        active_traces: deps.traces.active_count(),
    })
}
