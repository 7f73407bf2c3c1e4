//! Per-session chunk persistence.
//!
//! A session lives entirely on disk as `temp/<session_key>/`, one file per
//! chunk named by its decimal index plus a marker recording the declared
//! total. Nothing about sessions is stored in the repository.

use crate::error::{LifecycleError, LifecycleResult};
use bytes::Bytes;
use spool_core::{ChunkCoordinates, RejectReason, SessionKey, TEMP_DIR, TransferFault};
use spool_storage::FileStore;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::instrument;

const TOTAL_MARKER: &str = ".total";

pub struct ChunkStore {
    storage: Arc<dyn FileStore>,
}

impl ChunkStore {
    pub fn new(storage: Arc<dyn FileStore>) -> Self {
        Self { storage }
    }

    /// Key of a session's directory.
    pub fn session_dir(key: &SessionKey) -> String {
        format!("{TEMP_DIR}/{key}")
    }

    pub fn chunk_key(key: &SessionKey, index: u32) -> String {
        format!("{TEMP_DIR}/{key}/{index}")
    }

    fn marker_key(key: &SessionKey) -> String {
        format!("{TEMP_DIR}/{key}/{TOTAL_MARKER}")
    }

    /// Persist one chunk, overwriting any earlier copy of the same index.
    ///
    /// Returns whether this is conventionally the final chunk
    /// (`index + 1 == total`). That is not a completeness check; see
    /// [`first_missing`](Self::first_missing).
    #[instrument(skip(self, data), fields(session = %key, index = coords.index, size = data.len()))]
    pub async fn store_chunk(
        &self,
        key: &SessionKey,
        coords: ChunkCoordinates,
        data: Bytes,
    ) -> LifecycleResult<bool> {
        self.check_declared_total(key, coords.total).await?;

        self.storage
            .put(&Self::chunk_key(key, coords.index), data)
            .await
            .map_err(|e| {
                tracing::warn!(session = %key, index = coords.index, error = %e, "Failed to persist chunk");
                LifecycleError::Transfer(TransferFault::WriteFailure)
            })?;

        tracing::debug!("Stored chunk");
        Ok(coords.is_final())
    }

    /// The first write of a session fixes its total; later chunks must agree.
    async fn check_declared_total(&self, key: &SessionKey, total: u32) -> LifecycleResult<()> {
        match self.declared_total(key).await? {
            Some(expected) if expected != total => Err(RejectReason::TotalMismatch {
                declared: total,
                expected,
            }
            .into()),
            Some(_) => Ok(()),
            None => self
                .storage
                .put(&Self::marker_key(key), Bytes::from(total.to_string()))
                .await
                .map_err(|e| {
                    tracing::warn!(session = %key, error = %e, "Failed to record chunk total");
                    LifecycleError::Transfer(TransferFault::WriteFailure)
                }),
        }
    }

    /// Total declared by the session's first chunk, if the session exists.
    pub async fn declared_total(&self, key: &SessionKey) -> LifecycleResult<Option<u32>> {
        match self.storage.get(&Self::marker_key(key)).await {
            Ok(raw) => Ok(std::str::from_utf8(&raw)
                .ok()
                .and_then(|s| s.trim().parse().ok())),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Indices of the chunks currently on disk.
    pub async fn received_indices(&self, key: &SessionKey) -> LifecycleResult<BTreeSet<u32>> {
        let entries = self.storage.list_dir(&Self::session_dir(key)).await?;
        Ok(entries
            .into_iter()
            .filter(|entry| !entry.is_dir)
            .filter_map(|entry| entry.name.parse::<u32>().ok())
            .collect())
    }

    /// Lowest index in `[0, total)` not yet received, or `None` if complete.
    pub async fn first_missing(&self, key: &SessionKey, total: u32) -> LifecycleResult<Option<u32>> {
        let received = self.received_indices(key).await?;
        Ok((0..total).find(|index| !received.contains(index)))
    }

    /// Remove a session and everything in it.
    pub async fn discard(&self, key: &SessionKey) -> LifecycleResult<bool> {
        Ok(self.storage.delete_dir(&Self::session_dir(key)).await?)
    }
}
