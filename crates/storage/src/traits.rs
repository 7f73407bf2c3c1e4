//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use time::OffsetDateTime;

/// A boxed stream of bytes for streaming reads.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// File store addressed by `/`-separated keys relative to a root.
///
/// Deletions are idempotent: removing something that is already gone
/// succeeds and reports `false`.
#[async_trait]
pub trait FileStore: Send + Sync + 'static {
    /// Check if a file or directory exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get a file's size and modification time without reading it.
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta>;

    /// Get a file's content.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Get a file as a byte stream.
    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream>;

    /// Write a file atomically, creating parent directories.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Start a streaming write. Nothing is visible at `key` until `finish`.
    async fn put_stream(&self, key: &str) -> StorageResult<Box<dyn StreamingUpload>>;

    /// Create a directory and all missing parents.
    async fn create_dir_all(&self, key: &str) -> StorageResult<()>;

    /// Move a file, creating the destination's parent directories.
    async fn rename(&self, from: &str, to: &str) -> StorageResult<()>;

    /// Delete a file. Returns whether it existed.
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Recursively delete a directory. Returns whether it existed.
    async fn delete_dir(&self, key: &str) -> StorageResult<bool>;

    /// List the immediate children of a directory. A missing directory is empty.
    async fn list_dir(&self, key: &str) -> StorageResult<Vec<DirEntry>>;

    /// Absolute path for a key.
    async fn resolve(&self, key: &str) -> StorageResult<PathBuf>;

    /// Key for an absolute path under the root.
    fn key_for_path(&self, path: &Path) -> StorageResult<String>;

    /// Get the backend name for logging/metrics.
    fn backend_name(&self) -> &'static str;

    /// Check that the backend is usable.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// File metadata.
#[derive(Clone, Debug)]
pub struct ObjectMeta {
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: Option<OffsetDateTime>,
}

/// One child of a listed directory.
#[derive(Clone, Debug)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    pub last_modified: Option<OffsetDateTime>,
}

/// Streaming upload handle.
#[async_trait]
pub trait StreamingUpload: Send {
    /// Write a chunk of data.
    async fn write(&mut self, data: Bytes) -> StorageResult<()>;

    /// Complete the upload and return total bytes written.
    async fn finish(self: Box<Self>) -> StorageResult<u64>;

    /// Abort the upload and discard everything written.
    async fn abort(self: Box<Self>) -> StorageResult<()>;
}
