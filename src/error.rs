//! Common error types for the gateway

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::classifier::EngineError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("Request to Ollama timed out")]
    BackendTimeout,

    #[error("Failed to connect to Ollama: {0}")]
    BackendUnreachable(String),

    #[error("Ollama API error: {detail}")]
    BackendError { status: u16, detail: String },

    #[error("Hugging Face authentication failed. Check HUGGINGFACE_TOKEN or the API key file.")]
    ModelAuthFailed,

    #[error("Access forbidden to the Hugging Face model. Check model permissions or authentication.")]
    ModelAccessForbidden,

    #[error("Hugging Face API rate limit exceeded. Please try again later.")]
    ModelRateLimited,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Auth => AppError::ModelAuthFailed,
            EngineError::Forbidden => AppError::ModelAccessForbidden,
            EngineError::RateLimited => AppError::ModelRateLimited,
            EngineError::Load(detail) => AppError::Internal(detail),
            EngineError::Inference(detail) => AppError::Internal(detail),
        }
    }
}

/// Error response format
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub code: Option<String>,
}

impl AppError {
    /// HTTP status code for this error.
    ///
    /// `BackendError` passes the upstream status through so the caller sees
    /// what the backend answered.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Io(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::BackendTimeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::BackendUnreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BackendError { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::ModelAuthFailed
            | AppError::ModelAccessForbidden
            | AppError::ModelRateLimited => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (error_type, code) = match &self {
            AppError::Config(_) | AppError::Io(_) => ("server_error", None),
            AppError::InvalidInput(_) => ("invalid_request_error", None),
            AppError::BackendTimeout => ("timeout_error", None),
            AppError::BackendUnreachable(_) => ("backend_error", Some("backend_unreachable")),
            AppError::BackendError { .. } => ("backend_error", Some("upstream_error")),
            AppError::ModelAuthFailed => ("model_error", Some("model_auth_failed")),
            AppError::ModelAccessForbidden => ("model_error", Some("model_access_forbidden")),
            AppError::ModelRateLimited => ("model_error", Some("model_rate_limited")),
            AppError::Internal(_) => ("server_error", None),
        };

        // Internal details are logged, never returned to the client.
        let message = match &self {
            AppError::Internal(detail) => {
                error!(detail = %detail, "internal failure during dispatch");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                message,
                r#type: error_type.to_string(),
                code: code.map(|c| c.to_string()),
            },
        });

        (self.status_code(), body).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
