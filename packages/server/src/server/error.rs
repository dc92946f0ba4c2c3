//! Mapping of request failures to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::domains::epub::models::InvalidJobKey;
use crate::domains::epub::{ActivityError, JobError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Activity(#[from] ActivityError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<InvalidJobKey> for ApiError {
    fn from(e: InvalidJobKey) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Activity(activity) => match activity {
                ActivityError::ChannelTimeout(_) => StatusCode::REQUEST_TIMEOUT,
                ActivityError::Discovery(_) | ActivityError::Browser(_) => StatusCode::BAD_GATEWAY,
                ActivityError::Job(job) => match job {
                    JobError::Discovery(_) | JobError::Fetch(_) | JobError::Browser(_) => {
                        StatusCode::BAD_GATEWAY
                    }
                    JobError::NoChapters => StatusCode::UNPROCESSABLE_ENTITY,
                    JobError::Packaging(_) | JobError::Cache(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                },
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
