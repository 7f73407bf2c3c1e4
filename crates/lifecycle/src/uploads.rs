//! Upload pipeline driver.
//!
//! Chunk writes for one session may run concurrently. Merge, finalize and
//! cleanup for a session run under that session's async mutex, and the key
//! of every completed session is remembered so that a repeated final chunk
//! returns the original result instead of assembling a second artifact.

use crate::chunks::ChunkStore;
use crate::error::LifecycleResult;
use crate::manager::LifecycleManager;
use crate::merge::MergeEngine;
use crate::placer::ArtifactPlacer;
use bytes::Bytes;
use dashmap::DashMap;
use spool_core::config::UploadConfig;
use spool_core::{
    ChunkCoordinates, FileRecord, RejectReason, SessionKey, UploadOutcome, extension_of,
};
use spool_metadata::FileRow;
use spool_storage::FileStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::instrument;

/// One chunk as received from the request layer.
#[derive(Clone, Debug)]
pub struct ChunkUpload {
    /// Client-supplied session key, absent on the first chunk.
    pub session_key: Option<String>,
    pub chunk_index: u32,
    pub total_chunks: u32,
    /// Used only for its extension.
    pub file_name: String,
    pub payload: Bytes,
}

struct CompletedSession {
    uri_name: String,
    completed_at: Instant,
}

pub struct UploadService {
    chunks: ChunkStore,
    merger: MergeEngine,
    placer: ArtifactPlacer,
    manager: Arc<LifecycleManager>,
    config: UploadConfig,
    locks: DashMap<SessionKey, Arc<Mutex<()>>>,
    completed: DashMap<SessionKey, CompletedSession>,
    completed_retention: Duration,
}

impl UploadService {
    /// `completed_retention` bounds how long a finished session's result is
    /// remembered for duplicate submissions.
    pub fn new(
        storage: Arc<dyn FileStore>,
        manager: Arc<LifecycleManager>,
        config: UploadConfig,
        completed_retention: Duration,
    ) -> Self {
        Self {
            chunks: ChunkStore::new(storage.clone()),
            merger: MergeEngine::new(storage.clone()),
            placer: ArtifactPlacer::new(storage),
            manager,
            config,
            locks: DashMap::new(),
            completed: DashMap::new(),
            completed_retention,
        }
    }

    pub fn manager(&self) -> &Arc<LifecycleManager> {
        &self.manager
    }

    pub fn placer(&self) -> &ArtifactPlacer {
        &self.placer
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Accept one chunk.
    ///
    /// Assembly starts once every index in `[0, total)` is on disk, or when
    /// the conventionally final chunk arrives; in the latter case a gap fails
    /// with `ChunkIncomplete` and the client resubmits.
    #[instrument(skip(self, upload), fields(index = upload.chunk_index, total = upload.total_chunks))]
    pub async fn handle_chunk(&self, upload: ChunkUpload) -> LifecycleResult<UploadOutcome> {
        let key = SessionKey::parse_or_generate(upload.session_key.as_deref())?;
        let coords = ChunkCoordinates::new(upload.chunk_index, upload.total_chunks)?;
        let extension = self.accept_extension(&upload.file_name)?;
        if let Some(max) = self.config.chunk_limit()
            && upload.payload.len() as u64 > max
        {
            return Err(RejectReason::ChunkTooLarge {
                size: upload.payload.len() as u64,
                max,
            }
            .into());
        }

        if let Some(uri_name) = self.completed_uri(&key) {
            return Ok(UploadOutcome::Complete { uri_name });
        }

        let stored = self.chunks.store_chunk(&key, coords, upload.payload).await;
        let conventional_final = match stored {
            Ok(is_final) => is_final,
            // The session directory was removed under us by a finishing request.
            Err(e) => return self.finished_elsewhere(&key).await?.ok_or(e),
        };
        let gap = match self.chunks.first_missing(&key, coords.total).await {
            Ok(gap) => gap,
            Err(e) => return self.finished_elsewhere(&key).await?.ok_or(e),
        };
        if gap.is_some() && !conventional_final {
            if let Some(outcome) = self.finished_elsewhere(&key).await? {
                return Ok(outcome);
            }
            return Ok(UploadOutcome::InProgress { session_key: key });
        }

        let lock = self.session_lock(&key);
        let _guard = lock.lock().await;

        if let Some(outcome) = self.finished_elsewhere(&key).await? {
            return Ok(outcome);
        }

        let record = self
            .assemble(&key, coords.total, &upload.file_name, &extension)
            .await?;
        let row = self.manager.register(&record).await?;
        // Recorded before the session directory goes away, so a late chunk
        // that recreates it sees the session as finished.
        self.completed.insert(
            key.clone(),
            CompletedSession {
                uri_name: row.uri_name.clone(),
                completed_at: Instant::now(),
            },
        );
        self.placer.release_session(&key).await;

        tracing::info!(session = %key, uri_name = %row.uri_name, size = row.size, "Upload complete");
        Ok(UploadOutcome::Complete {
            uri_name: row.uri_name,
        })
    }

    /// Store a whole file from memory, bypassing the chunk protocol.
    #[instrument(skip(self, payload), fields(size = payload.len()))]
    pub async fn ingest_bytes(&self, payload: Bytes, file_name: &str) -> LifecycleResult<FileRow> {
        let extension = self.accept_extension(file_name)?;
        if let Some(max) = self.config.file_limit()
            && payload.len() as u64 > max
        {
            return Err(RejectReason::FileTooLarge {
                size: payload.len() as u64,
                max,
            }
            .into());
        }
        let record = self
            .placer
            .finalize_bytes(payload, file_name, &extension)
            .await?;
        self.manager.register(&record).await
    }

    /// Forget completed sessions past retention and idle session locks.
    pub fn prune_sessions(&self) -> usize {
        let before = self.completed.len();
        let retention = self.completed_retention;
        self.completed
            .retain(|_, session| session.completed_at.elapsed() < retention);
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before.saturating_sub(self.completed.len())
    }

    async fn assemble(
        &self,
        key: &SessionKey,
        total: u32,
        file_name: &str,
        extension: &str,
    ) -> LifecycleResult<FileRecord> {
        let merged = self.merger.merge(key, total, extension).await?;

        if let Some(max) = self.config.file_limit()
            && merged.size > max
        {
            self.chunks.discard(key).await?;
            return Err(RejectReason::FileTooLarge {
                size: merged.size,
                max,
            }
            .into());
        }

        self.placer
            .finalize(key, &merged.key, file_name, extension)
            .await
    }

    fn accept_extension(&self, file_name: &str) -> LifecycleResult<String> {
        let extension = extension_of(file_name)?;
        if !self.config.allows(&extension) {
            return Err(RejectReason::DisallowedExtension(extension).into());
        }
        Ok(extension)
    }

    /// The original result if `key` was completed by another request, after
    /// removing any session directory this request recreated.
    async fn finished_elsewhere(&self, key: &SessionKey) -> LifecycleResult<Option<UploadOutcome>> {
        let Some(uri_name) = self.completed_uri(key) else {
            return Ok(None);
        };
        self.chunks.discard(key).await?;
        Ok(Some(UploadOutcome::Complete { uri_name }))
    }

    fn completed_uri(&self, key: &SessionKey) -> Option<String> {
        self.completed.get(key).map(|session| session.uri_name.clone())
    }

    fn session_lock(&self, key: &SessionKey) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
