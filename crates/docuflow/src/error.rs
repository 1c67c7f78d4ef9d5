//! Error types for the job service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for DocuFlow operations
pub type Result<T> = std::result::Result<T, Error>;

/// DocuFlow errors
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed upload or request body
    #[error("{0}")]
    Validation(String),

    /// Uploaded file exceeds the configured size cap
    #[error("File exceeds the maximum upload size of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Job not found
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Job exists but has no downloadable output
    #[error("{0}")]
    NotReady(String),

    /// Status or progress change that would move a job backwards
    #[error("Invalid job transition: {0}")]
    InvalidTransition(String),

    /// Tool type outside the catalog
    #[error("Unsupported tool type: {0}")]
    UnsupportedTool(String),

    /// Processing queue cannot accept more jobs
    #[error("Processing queue is full")]
    QueueFull,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error (client side)
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response returned to the client
    #[error("Server returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the error means the requested resource does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::JobNotFound(_) | Error::NotReady(_) => true,
            Error::Api { status, .. } => *status == 404,
            _ => false,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            Error::PayloadTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            Error::JobNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::NotReady(_) => (StatusCode::NOT_FOUND, "not_ready"),
            Error::InvalidTransition(_) => (StatusCode::BAD_REQUEST, "invalid_transition"),
            Error::UnsupportedTool(_) => (StatusCode::BAD_REQUEST, "unsupported_tool"),
            Error::QueueFull => (StatusCode::SERVICE_UNAVAILABLE, "queue_full"),
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "http_error"),
            Error::Api { .. } => (StatusCode::BAD_GATEWAY, "upstream_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", message);
        }

        let body = Json(json!({
            "message": message,
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
