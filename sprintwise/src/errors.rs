use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// A deployment setting required by the operation is missing
    #[error("{setting} is not configured")]
    Configuration { setting: &'static str },

    /// Invalid request data
    #[error("{message}")]
    BadRequest { message: String },

    /// Request is well-formed but misses a required parameter
    #[error("{message}")]
    Unprocessable { message: String },

    /// Multipart body could not be read (malformed, or over the upload size limit)
    #[error(transparent)]
    Multipart(#[from] MultipartError),

    /// The generation provider answered with a non-success status
    #[error("Provider returned {status}: {body}")]
    Remote { status: StatusCode, body: String },

    /// The provider answered successfully but the payload lacks what we need
    #[error("{message}")]
    InvalidUpstreamResponse { message: String },

    /// Unexpected error with full context chain (transport failures, local I/O)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Multipart(e) => e.status(),
            Error::Remote { status, .. } => *status,
            Error::InvalidUpstreamResponse { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Configuration { .. } | Error::BadRequest { .. } | Error::Unprocessable { .. } => self.to_string(),
            Error::Multipart(e) => e.body_text(),
            // The provider's own error text is surfaced as-is
            Error::Remote { body, .. } => body.clone(),
            Error::InvalidUpstreamResponse { message } => message.clone(),
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Configuration { .. } | Error::InvalidUpstreamResponse { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Remote { .. } => {
                tracing::warn!("Upstream error: {}", self);
            }
            Error::BadRequest { .. } | Error::Unprocessable { .. } | Error::Multipart(_) => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let body = json!({ "detail": self.user_message() });
        (self.status_code(), Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
