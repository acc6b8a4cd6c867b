//! Top-level error type shared by every gateway crate.
//!
//! Each crate defines its own narrow, `thiserror`-derived error enum for
//! its own concerns; this type is the place they all convert into once
//! they cross a layer boundary the HTTP surface has to render.

use http::StatusCode;
use serde::Serialize;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("backend not found: {0}")]
    BackendNotFound(String),

    #[error("configuration error: {0}")]
    ConfigMissing(String),

    #[error("upstream connection failed: {0}")]
    ConnectionFailed(String),

    #[error("upstream returned an error (status {status}): {body}")]
    UpstreamError { status: u16, body: String },

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            Error::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            // Spec 7: backend-not-found and config-missing are server
            // misconfiguration, not a client input error.
            Error::BackendNotFound(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::ConfigMissing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::ConnectionFailed(_) => StatusCode::BAD_GATEWAY,
            Error::UpstreamError { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Error::TaskNotFound(_) => StatusCode::NOT_FOUND,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// OpenAI-shaped `type` field for the error envelope.
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::Validation(_) => "invalid_request_error",
            Error::Auth(_) => "authentication_error",
            Error::RateLimited => "rate_limit_error",
            Error::BackendNotFound(_) | Error::ConfigMissing(_) => "internal_error",
            Error::ConnectionFailed(_) | Error::UpstreamError { .. } => "upstream_error",
            Error::TaskNotFound(_) => "not_found_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Render the OpenAI error envelope: `{"error": {"message", "type", "code"?}}`.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorBody {
                message: self.to_string(),
                error_type: self.error_type(),
                code: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
