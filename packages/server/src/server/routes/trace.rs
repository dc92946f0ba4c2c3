use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};

use crate::domains::epub::JobKey;
use crate::server::app::AxumAppState;

#[derive(Debug, Default, Deserialize)]
pub struct GetTraceRequest {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTraceResponse {
    trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_key: Option<JobKey>,
}

/// POST /get-trace
///
/// Hands out a trace id for the client to open its channel with, plus the
/// job key of the listing when one is given. Returns immediately; the
/// requests that do the work wait for the channel instead.
pub async fn get_trace_handler(
    Extension(state): Extension<AxumAppState>,
    body: Option<Json<GetTraceRequest>>,
) -> Json<GetTraceResponse> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let trace_id = state.server_deps.traces.create_trace();

    Json(GetTraceResponse {
        trace_id,
        job_key: request.url.as_deref().map(JobKey::for_listing),
    })
}
