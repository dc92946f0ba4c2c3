use axum::{
    extract::{Extension, Path},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use crate::domains::epub::JobKey;
use crate::server::app::AxumAppState;
use crate::server::error::ApiError;

const NOT_FOUND: &str = "Could not find file";

/// GET /:job_key
///
/// Serves a finished book as an attachment named after its title.
pub async fn download_handler(
    Extension(state): Extension<AxumAppState>,
    Path(job_key): Path<String>,
) -> Result<Response, ApiError> {
    let not_found = || ApiError::NotFound(NOT_FOUND.to_string());

    let key = JobKey::parse(&job_key).map_err(|_| not_found())?;
    let result = state
        .server_deps
        .cache
        .lookup(key.as_str())
        .await
        .ok_or_else(not_found)?;

    let bytes = tokio::fs::read(&result.path).await.map_err(|e| {
        warn!(job_key = %key, path = %result.path.display(), error = %e, "Could not read book");
        not_found()
    })?;
    info!(job_key = %key, title = %result.title, bytes = bytes.len(), "Serving book");

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/epub+zip"),
            ),
            (header::CONTENT_DISPOSITION, attachment(&result.title)),
        ],
        bytes,
    )
        .into_response())
}

/// `Content-Disposition` for `{title}.epub`, with an ASCII fallback name
/// for clients that ignore `filename*`.
fn attachment(title: &str) -> HeaderValue {
    let file_name = format!("{title}.epub");
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    let value = format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(&file_name)
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_header() {
        let value = attachment("My Series");
        assert_eq!(
            value.to_str().unwrap(),
            "attachment; filename=\"My Series.epub\"; filename*=UTF-8''My%20Series.epub"
        );
    }

    #[test]
    fn test_attachment_header_non_ascii_title() {
        let value = attachment("Één \"quote\"");
        let text = value.to_str().unwrap();
        assert!(text.starts_with("attachment; filename=\"__n _quote_.epub\""));
        assert!(text.contains("filename*=UTF-8''%C3%89%C3%A9n%20%22quote%22.epub"));
    }
}
