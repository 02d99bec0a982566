//! Common error types for the media studio

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Credential error: {0}")]
    Credentials(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Failed to start long-running operation: {0}")]
    OperationStart(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Output blocked by safety filters: {0}")]
    ContentFiltered(String),

    #[error("Unsupported storage location: {0}")]
    UnsupportedStorage(String),

    #[error("Empty result: {0}")]
    EmptyResult(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short, stable description used as the `error` field of responses
    pub fn summary(&self) -> &'static str {
        match self {
            AppError::Config(_) => "Configuration error",
            AppError::Io(_) => "Storage error",
            AppError::Json(_) => "Serialization error",
            AppError::HttpClient(_) => "Request to generation service failed",
            AppError::Credentials(_) => "Credential error",
            AppError::Validation(_) => "Invalid request",
            AppError::NotFound(_) => "Not found",
            AppError::Upstream(_) => "Generation service returned an error",
            AppError::OperationStart(_) => "Failed to start generation",
            AppError::GenerationFailed(_) => "Generation failed",
            AppError::ContentFiltered(_) => "Content was filtered",
            AppError::UnsupportedStorage(_) => "Unsupported storage location",
            AppError::EmptyResult(_) => "Generation returned no output",
            AppError::Timeout(_) => "Generation timed out",
            AppError::Internal(_) => "Internal error",
        }
    }
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = Json(ErrorResponse {
            error: self.summary().to_string(),
            details: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
