//! Error types for medimind-api

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or expired session (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not the owner (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Conflict (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Third-party API failed (502)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// medimind-common error
    #[error("Common error: {0}")]
    Common(#[from] medimind_common::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Common(medimind_common::Error::Database(err))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Common(medimind_common::Error::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Common(medimind_common::Error::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) | ApiError::Io(_) | ApiError::Other(_) | ApiError::Common(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_code, message) = match self {
            ApiError::NotFound(msg) => ("NOT_FOUND", msg),
            ApiError::BadRequest(msg) => ("BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => ("UNAUTHORIZED", msg),
            ApiError::Forbidden(msg) => ("FORBIDDEN", msg),
            ApiError::Conflict(msg) => ("CONFLICT", msg),
            ApiError::Upstream(msg) => ("UPSTREAM_ERROR", msg),
            ApiError::Internal(msg) => ("INTERNAL_ERROR", msg),
            ApiError::Io(ref err) => ("IO_ERROR", err.to_string()),
            ApiError::Other(ref err) => ("INTERNAL_ERROR", err.to_string()),
            ApiError::Common(medimind_common::Error::NotFound(msg)) => ("NOT_FOUND", msg),
            ApiError::Common(medimind_common::Error::InvalidInput(msg)) => ("BAD_REQUEST", msg),
            ApiError::Common(ref err) => {
                tracing::error!("Request failed: {}", err);
                ("COMMON_ERROR", err.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
