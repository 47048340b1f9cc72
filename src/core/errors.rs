use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failures raised by the indexing pipeline and the query engine.
///
/// Parse problems in input files never surface here; the loader logs and
/// skips them. Everything in this enum is fatal for the operation that
/// produced it, except `Remote` during a build, where the pipeline drops the
/// affected batch and keeps going.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("remote call failed: {0}")]
    Remote(String),
    #[error("artifacts missing or corrupt: {0}")]
    Artifact(String),
    #[error("embedding dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("configuration error: no embeddings were produced, refusing to build an empty index")]
    NoVectors,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    pub fn remote<E: std::fmt::Display>(err: E) -> Self {
        RagError::Remote(err.to_string())
    }

    /// True for errors that mean the deployment itself is misconfigured.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RagError::Config(_) | RagError::DimensionMismatch { .. } | RagError::NoVectors
        )
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("bad gateway: {0}")]
    BadGateway(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::Remote(msg) => ApiError::BadGateway(msg),
            RagError::Artifact(msg) => ApiError::ServiceUnavailable(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
