//! Filesystem collaborator for spool.
//!
//! This crate provides:
//! - A `FileStore` trait over keys relative to a storage root
//! - Atomic writes (temp file + rename) and streaming writes
//! - Idempotent file and directory deletion
//! - A local filesystem backend with path traversal protection

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::filesystem::FilesystemBackend;
pub use error::{StorageError, StorageResult};
pub use traits::{ByteStream, DirEntry, FileStore, ObjectMeta, StreamingUpload};

use spool_core::config::StorageConfig;
use std::sync::Arc;

/// Create a file store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn FileStore>> {
    config.validate().map_err(StorageError::Config)?;
    let backend = FilesystemBackend::new(&config.root).await?;
    Ok(Arc::new(backend))
}
