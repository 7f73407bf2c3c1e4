//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use spool_core::{RejectReason, TransferFault};
use spool_lifecycle::LifecycleError;
use spool_metadata::MetadataError;
use spool_storage::StorageError;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Rejection label, set for `upload_rejected`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    /// First missing chunk, set for `chunk_incomplete`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_index: Option<u32>,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("upload rejected: {0}")]
    Rejected(RejectReason),

    #[error("chunk {missing_index} is missing")]
    ChunkIncomplete { missing_index: u32 },

    #[error("transfer failed: {0}")]
    Transfer(TransferFault),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("{0}")]
    Core(#[from] spool_core::Error),
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::UploadRejected(reason) => Self::Rejected(reason),
            LifecycleError::ChunkIncomplete { missing_index } => {
                Self::ChunkIncomplete { missing_index }
            }
            LifecycleError::Transfer(fault) => Self::Transfer(fault),
            LifecycleError::Unauthorized => {
                Self::Forbidden("caller does not own this file".to_string())
            }
            LifecycleError::Core(e) => Self::Core(e),
            LifecycleError::Storage(e) => Self::Storage(e),
            LifecycleError::Metadata(e) => Self::Metadata(e),
        }
    }
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Rejected(_) => "upload_rejected",
            Self::ChunkIncomplete { .. } => "chunk_incomplete",
            Self::Transfer(_) => "transfer_fault",
            Self::Forbidden(_) => "forbidden",
            Self::Internal(_) => "internal_error",
            Self::Storage(_) => "storage_error",
            Self::Metadata(_) => "metadata_error",
            Self::Core(_) => "invalid_request",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Rejected(_) => StatusCode::BAD_REQUEST,
            Self::ChunkIncomplete { .. } => StatusCode::CONFLICT,
            Self::Transfer(TransferFault::SizeExceeded) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Transfer(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(e) => match e {
                StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Metadata(e) => match e {
                MetadataError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Core(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
            reason: match &self {
                Self::Rejected(reason) => Some(reason.label()),
                _ => None,
            },
            missing_index: match &self {
                Self::ChunkIncomplete { missing_index } => Some(*missing_index),
                _ => None,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
