//! Error types for the pdfedit server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pdfedit_core::EditError;
use thiserror::Error;
use tracing::error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Upload exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Failed to save document: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, "File not found".to_string()),
            ServerError::InvalidUpload(reason) => (
                StatusCode::BAD_REQUEST,
                format!("Please choose a PDF file ({})", reason),
            ),
            ServerError::PayloadTooLarge(limit) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("File is too large (limit: {} MB)", limit / (1024 * 1024)),
            ),
            ServerError::Persistence(msg) => {
                error!("Persistence failure: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to save the document".to_string(),
                )
            }
            ServerError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        (status, message).into_response()
    }
}

impl From<EditError> for ServerError {
    fn from(err: EditError) -> Self {
        match err {
            EditError::NotFound(id) => ServerError::NotFound(id),
            EditError::InvalidUpload(reason) => ServerError::InvalidUpload(reason),
            EditError::PersistenceFailure(e) => ServerError::Persistence(e.to_string()),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("Worker task failed: {}", err))
    }
}
