//! Common test utilities and fixtures.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use spool_core::config::UploadConfig;
use spool_core::{FileRecord, SessionKey, UploadOutcome};
use spool_lifecycle::{ChunkUpload, LifecycleManager, Sweeper, UploadService};
use spool_metadata::{FileRow, MetadataStore, SqliteStore};
use spool_storage::{
    ByteStream, DirEntry, FileStore, FilesystemBackend, ObjectMeta, StorageError, StorageResult,
    StreamingUpload,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use time::{Duration, OffsetDateTime};

/// A complete pipeline over a temp directory and a temp SQLite database.
pub struct TestEnv {
    pub root: PathBuf,
    pub storage: Arc<dyn FileStore>,
    pub metadata: Arc<dyn MetadataStore>,
    pub manager: Arc<LifecycleManager>,
    pub uploads: Arc<UploadService>,
    pub sweeper: Sweeper,
    _temp_dir: TempDir,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_upload_config(UploadConfig::default()).await
    }

    pub async fn with_upload_config(config: UploadConfig) -> Self {
        Self::build(config, std::time::Duration::from_secs(24 * 60 * 60)).await
    }

    /// Environment whose upload service forgets completed sessions after
    /// `retention`.
    pub async fn with_completed_retention(retention: std::time::Duration) -> Self {
        Self::build(UploadConfig::default(), retention).await
    }

    async fn build(config: UploadConfig, completed_retention: std::time::Duration) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let backend = FilesystemBackend::new(temp_dir.path().join("files"))
            .await
            .expect("Failed to create storage");
        let root = backend.root().to_path_buf();
        let storage: Arc<dyn FileStore> = Arc::new(backend);
        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(temp_dir.path().join("spool.db"), "files", None)
                .await
                .expect("Failed to create metadata store"),
        );
        let manager = Arc::new(LifecycleManager::new(
            metadata.clone(),
            storage.clone(),
            Duration::hours(12),
        ));
        let uploads = Arc::new(UploadService::new(
            storage.clone(),
            manager.clone(),
            config,
            completed_retention,
        ));
        let sweeper = Sweeper::new(storage.clone(), Duration::hours(24));

        Self {
            root,
            storage,
            metadata,
            manager,
            uploads,
            sweeper,
            _temp_dir: temp_dir,
        }
    }

    pub fn session_dir(&self, key: &SessionKey) -> PathBuf {
        self.root.join("temp").join(key.as_str())
    }

    /// Every finalized artifact on disk, excluding in-progress sessions.
    pub fn artifacts(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        collect_files(&self.root, &self.root.join("temp"), &mut found);
        found.sort();
        found
    }

    /// Upload `parts` as chunks `0..n` in order and return the final outcome.
    pub async fn upload_all(&self, file_name: &str, parts: &[&str]) -> UploadOutcome {
        let total = parts.len() as u32;
        let mut session_key: Option<String> = None;
        let mut outcome = None;
        for (index, part) in parts.iter().enumerate() {
            let result = self
                .uploads
                .handle_chunk(chunk(session_key.clone(), index as u32, total, file_name, part.as_bytes()))
                .await
                .expect("chunk upload failed");
            if let UploadOutcome::InProgress { session_key: key } = &result {
                session_key = Some(key.to_string());
            }
            outcome = Some(result);
        }
        outcome.expect("no parts uploaded")
    }

    /// Insert a record for a real file written under the storage root.
    pub async fn seed_file(
        &self,
        uri_name: &str,
        content: &[u8],
        is_temp: bool,
        link_id: &str,
        age: Duration,
    ) -> FileRow {
        let key = format!("2024/01/15/{uri_name}");
        self.storage
            .put(&key, Bytes::copy_from_slice(content))
            .await
            .unwrap();
        let path = self.storage.resolve(&key).await.unwrap();
        let record = FileRecord {
            name: format!("original-{uri_name}"),
            size: content.len() as u64,
            path: path.to_string_lossy().into_owned(),
            extension: "png".to_string(),
            uri_name: uri_name.to_string(),
            is_temp,
            create_time: OffsetDateTime::now_utc() - age,
            link_id: link_id.to_string(),
        };
        self.manager.register(&record).await.unwrap()
    }

    /// Insert a record whose path is a directory, so deleting it fails.
    pub async fn seed_undeletable(
        &self,
        uri_name: &str,
        is_temp: bool,
        link_id: &str,
        age: Duration,
    ) -> FileRow {
        let key = format!("2024/01/15/{uri_name}");
        self.storage.create_dir_all(&key).await.unwrap();
        let path = self.storage.resolve(&key).await.unwrap();
        let record = FileRecord {
            name: format!("original-{uri_name}"),
            size: 0,
            path: path.to_string_lossy().into_owned(),
            extension: "png".to_string(),
            uri_name: uri_name.to_string(),
            is_temp,
            create_time: OffsetDateTime::now_utc() - age,
            link_id: link_id.to_string(),
        };
        self.manager.register(&record).await.unwrap()
    }

    pub async fn row(&self, uri_name: &str) -> Option<FileRow> {
        self.manager.lookup(uri_name).await.unwrap()
    }
}

pub fn chunk(
    session_key: Option<String>,
    index: u32,
    total: u32,
    file_name: &str,
    payload: &[u8],
) -> ChunkUpload {
    ChunkUpload {
        session_key,
        chunk_index: index,
        total_chunks: total,
        file_name: file_name.to_string(),
        payload: Bytes::copy_from_slice(payload),
    }
}

fn collect_files(dir: &Path, skip: &Path, found: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path == skip {
            continue;
        }
        if path.is_dir() {
            collect_files(&path, skip, found);
        } else {
            found.push(path);
        }
    }
}

/// Store that delegates to `inner` but fails deletes of one key.
pub struct FailingDeletes {
    pub inner: Arc<dyn FileStore>,
    pub fail_key: String,
}

impl FailingDeletes {
    fn check(&self, key: &str) -> StorageResult<()> {
        if key == self.fail_key {
            return Err(StorageError::Io(std::io::Error::other(format!(
                "injected delete failure for {key}"
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl FileStore for FailingDeletes {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        self.inner.head(key).await
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.inner.get(key).await
    }

    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream> {
        self.inner.get_stream(key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        self.inner.put(key, data).await
    }

    async fn put_stream(&self, key: &str) -> StorageResult<Box<dyn StreamingUpload>> {
        self.inner.put_stream(key).await
    }

    async fn create_dir_all(&self, key: &str) -> StorageResult<()> {
        self.inner.create_dir_all(key).await
    }

    async fn rename(&self, from: &str, to: &str) -> StorageResult<()> {
        self.inner.rename(from, to).await
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        self.check(key)?;
        self.inner.delete(key).await
    }

    async fn delete_dir(&self, key: &str) -> StorageResult<bool> {
        self.check(key)?;
        self.inner.delete_dir(key).await
    }

    async fn list_dir(&self, key: &str) -> StorageResult<Vec<DirEntry>> {
        self.inner.list_dir(key).await
    }

    async fn resolve(&self, key: &str) -> StorageResult<PathBuf> {
        self.inner.resolve(key).await
    }

    fn key_for_path(&self, path: &Path) -> StorageResult<String> {
        self.inner.key_for_path(path)
    }

    fn backend_name(&self) -> &'static str {
        "failing-deletes"
    }
}
