//! Lifecycle error types.

use spool_core::{RejectReason, TransferFault};
use spool_metadata::MetadataError;
use spool_storage::StorageError;
use thiserror::Error;

/// Errors surfaced by the upload pipeline and the lifecycle manager.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Invalid input. Not retryable as submitted.
    #[error("upload rejected: {0}")]
    UploadRejected(RejectReason),

    /// Merge found a gap. The session is left intact for the client to
    /// resubmit the missing chunk.
    #[error("chunk {missing_index} is missing")]
    ChunkIncomplete { missing_index: u32 },

    #[error("transfer failed: {0}")]
    Transfer(TransferFault),

    #[error("caller does not own this file")]
    Unauthorized,

    #[error("invalid request: {0}")]
    Core(spool_core::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),
}

impl LifecycleError {
    /// Whether the same request can succeed later without changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ChunkIncomplete { .. })
    }
}

impl From<spool_core::Error> for LifecycleError {
    fn from(err: spool_core::Error) -> Self {
        match RejectReason::from_error(&err) {
            Some(reason) => Self::UploadRejected(reason),
            None => Self::Core(err),
        }
    }
}

impl From<RejectReason> for LifecycleError {
    fn from(reason: RejectReason) -> Self {
        Self::UploadRejected(reason)
    }
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = std::result::Result<T, LifecycleError>;
