//! Finalization of merged artifacts into canonical storage paths.

use crate::chunks::ChunkStore;
use crate::error::LifecycleResult;
use bytes::Bytes;
use spool_core::upload::normalize_extension;
use spool_core::{DatePartition, FileRecord, SessionKey, UriName};
use spool_storage::FileStore;
use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

pub struct ArtifactPlacer {
    storage: Arc<dyn FileStore>,
}

impl ArtifactPlacer {
    pub fn new(storage: Arc<dyn FileStore>) -> Self {
        Self { storage }
    }

    /// Move a merged artifact to `YYYY/MM/DD/<unique>.<ext>` and describe it.
    ///
    /// The session directory is left in place; the caller releases it with
    /// [`release_session`](Self::release_session) once the result is recorded.
    #[instrument(skip(self), fields(session = %key))]
    pub async fn finalize(
        &self,
        key: &SessionKey,
        merged_key: &str,
        original_name: &str,
        extension: &str,
    ) -> LifecycleResult<FileRecord> {
        let now = OffsetDateTime::now_utc();
        let (uri_name, target) = self.allocate(now, extension).await?;
        self.storage.rename(merged_key, &target).await?;
        let record = self
            .describe(&uri_name, &target, original_name, extension, now)
            .await?;

        tracing::info!(uri_name = %record.uri_name, size = record.size, "Finalized artifact");
        Ok(record)
    }

    /// Delete a finished session's directory. A failure is logged and left
    /// for the sweeper.
    pub async fn release_session(&self, key: &SessionKey) {
        if let Err(e) = self.storage.delete_dir(&ChunkStore::session_dir(key)).await {
            tracing::warn!(session = %key, error = %e, "Failed to clean up session directory");
        }
    }

    /// Store an in-memory payload directly, bypassing the chunk protocol.
    #[instrument(skip(self, payload), fields(size = payload.len()))]
    pub async fn finalize_bytes(
        &self,
        payload: Bytes,
        original_name: &str,
        extension: &str,
    ) -> LifecycleResult<FileRecord> {
        let extension = normalize_extension(extension)?;
        let now = OffsetDateTime::now_utc();
        let (uri_name, target) = self.allocate(now, &extension).await?;
        self.storage.put(&target, payload).await?;
        let record = self
            .describe(&uri_name, &target, original_name, &extension, now)
            .await?;

        tracing::info!(uri_name = %record.uri_name, size = record.size, "Stored artifact");
        Ok(record)
    }

    /// Absolute path of the artifact a `uri_name` refers to.
    pub async fn resolve_path(&self, uri_name: &str) -> LifecycleResult<PathBuf> {
        let uri_name = UriName::parse(uri_name)?;
        Ok(self.storage.resolve(&uri_name.relative_path()).await?)
    }

    async fn allocate(
        &self,
        now: OffsetDateTime,
        extension: &str,
    ) -> LifecycleResult<(UriName, String)> {
        let partition = DatePartition::of(now);
        self.storage.create_dir_all(&partition.dir_key()).await?;
        let unique = Uuid::new_v4().simple().to_string();
        let uri_name = UriName::new(partition, &unique, extension);
        let target = uri_name.relative_path();
        Ok((uri_name, target))
    }

    async fn describe(
        &self,
        uri_name: &UriName,
        target: &str,
        original_name: &str,
        extension: &str,
        now: OffsetDateTime,
    ) -> LifecycleResult<FileRecord> {
        let meta = self.storage.head(target).await?;
        let path = self.storage.resolve(target).await?;
        Ok(FileRecord {
            name: original_name.to_string(),
            size: meta.size,
            path: path.to_string_lossy().into_owned(),
            extension: extension.to_string(),
            uri_name: uri_name.to_string(),
            is_temp: true,
            create_time: now,
            link_id: String::new(),
        })
    }
}
