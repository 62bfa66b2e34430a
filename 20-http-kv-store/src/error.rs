use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::debug;

/// Client-facing failures of the HTTP adapter. None of them reach the store.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid JSON")]
    InvalidJson(#[source] serde_json::Error),
    #[error("key not specified")]
    MissingKey,
    #[error("key not found")]
    KeyNotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidJson(_) | ApiError::MissingKey => StatusCode::BAD_REQUEST,
            ApiError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::InvalidJson(err) => debug!(error = %err, "rejected request body"),
            ApiError::KeyNotFound(key) => debug!(%key, "delete of unknown key"),
            ApiError::MissingKey => debug!("delete without key"),
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
