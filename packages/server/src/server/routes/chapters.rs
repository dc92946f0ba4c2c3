//! Discovery and job endpoints.
//!
//! Both wait for the client's trace channel before doing any work. Jobs run
//! on their own task, so a client that hangs up does not stop them.

use axum::{extract::Extension, Json};
use extraction::{ChapterCandidate, ChapterRef};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::domains::epub::{propose_traced, run_traced_job, JobInput, JobKey};
use crate::server::app::AxumAppState;
use crate::server::error::ApiError;

/// A `jobKey` sent along is ignored: proposals are not cached.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposeRequest {
    trace_id: String,
    url: String,
}

/// POST /post
///
/// Lists the chapters of a listing page in a proposed order (ranks 10, 20,
/// 30, ...) for the client to confirm. Fetches no chapter content.
pub async fn propose_handler(
    Extension(state): Extension<AxumAppState>,
    Json(request): Json<ProposeRequest>,
) -> Result<Json<Vec<ChapterCandidate>>, ApiError> {
    let url = parse_url(&request.url)?;
    info!(trace_id = %request.trace_id, listing = %url, "Chapter proposal requested");

    let proposed = propose_traced(state.server_deps.clone(), request.trace_id, url).await?;
    Ok(Json(proposed))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    trace_id: String,
    #[serde(default)]
    job_key: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    chapters: Option<Vec<ChapterRef>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponse {
    job_key: JobKey,
    title: String,
    download: String,
    from_cache: bool,
}

/// POST /create
///
/// Binds the confirmed chapters (or, without them, the whole listing) into
/// a book and answers once it is downloadable.
pub async fn create_handler(
    Extension(state): Extension<AxumAppState>,
    Json(request): Json<CreateRequest>,
) -> Result<Json<CreateResponse>, ApiError> {
    let (job_key, input) = resolve_job(&request)?;
    info!(trace_id = %request.trace_id, job_key = %job_key, "Book requested");

    let job = tokio::spawn(run_traced_job(
        state.server_deps.clone(),
        request.trace_id,
        job_key,
        input,
    ));
    let outcome = job
        .await
        .map_err(|e| ApiError::Internal(format!("job task failed: {e}")))??;

    Ok(Json(CreateResponse {
        download: format!("/{}", outcome.key),
        job_key: outcome.key,
        title: outcome.result.title,
        from_cache: outcome.from_cache,
    }))
}

/// Work out what the job binds and which key it is cached under. A
/// client-supplied key wins; otherwise the key derives from the input.
fn resolve_job(request: &CreateRequest) -> Result<(JobKey, JobInput), ApiError> {
    let supplied = request.job_key.as_deref().map(JobKey::parse).transpose()?;

    if let Some(chapters) = &request.chapters {
        let key = supplied.unwrap_or_else(|| JobKey::for_chapters(chapters));
        return Ok((key, JobInput::Chapters(chapters.clone())));
    }

    match &request.url {
        Some(raw) => {
            let url = parse_url(raw)?;
            let key = supplied.unwrap_or_else(|| JobKey::for_listing(raw));
            Ok((key, JobInput::Listing { url }))
        }
        None => Err(ApiError::BadRequest(
            "either url or chapters is required".to_string(),
        )),
    }
}

fn parse_url(raw: &str) -> Result<Url, ApiError> {
    Url::parse(raw).map_err(|e| ApiError::BadRequest(format!("invalid url {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> CreateRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_listing_job_keyed_by_raw_url() {
        let (key, input) = resolve_job(&request(serde_json::json!({
            "traceId": "t",
            "url": "https://serial.test/list"
        })))
        .unwrap();

        assert_eq!(key, JobKey::for_listing("https://serial.test/list"));
        assert!(matches!(input, JobInput::Listing { .. }));
    }

    #[test]
    fn test_chapters_take_precedence_over_url() {
        let (key, input) = resolve_job(&request(serde_json::json!({
            "traceId": "t",
            "url": "https://serial.test/list",
            "chapters": [{ "link": "https://serial.test/1", "title": "A - 1", "order": 10 }]
        })))
        .unwrap();

        let JobInput::Chapters(chapters) = input else {
            panic!("expected a chapter job");
        };
        assert_eq!(chapters[0].order, Some(10));
        assert_eq!(key, JobKey::for_chapters(&chapters));
    }

    #[test]
    fn test_supplied_key_wins() {
        let (key, _) = resolve_job(&request(serde_json::json!({
            "traceId": "t",
            "jobKey": "5d41402abc4b2a76b9719d911017c592",
            "url": "https://serial.test/list"
        })))
        .unwrap();
        assert_eq!(key.as_str(), "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn test_propose_request_ignores_job_key() {
        let request: ProposeRequest = serde_json::from_value(serde_json::json!({
            "traceId": "t",
            "jobKey": "not-a-key",
            "url": "https://serial.test/list"
        }))
        .unwrap();

        assert_eq!(request.trace_id, "t");
        assert_eq!(request.url, "https://serial.test/list");
    }

    #[test]
    fn test_rejects_empty_request() {
        let err = resolve_job(&request(serde_json::json!({ "traceId": "t" }))).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = resolve_job(&request(serde_json::json!({
            "traceId": "t",
            "jobKey": "../secret"
        })))
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
