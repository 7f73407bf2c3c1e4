//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid session key: {0}")]
    InvalidSessionKey(String),

    #[error("invalid chunk coordinates: index {index}, total {total}")]
    InvalidChunk { index: u32, total: u32 },

    #[error("invalid extension: {0:?}")]
    InvalidExtension(String),

    #[error("invalid uri name: {0}")]
    InvalidUriName(String),

    #[error("link id must not be empty")]
    EmptyLinkId,

    #[error("unknown reference syntax: {0}")]
    UnknownSyntax(String),

    #[error("invalid reference pattern for {syntax}: {reason}")]
    InvalidPattern { syntax: String, reason: String },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
