//! Ordered concatenation of a session's chunks.

use crate::chunks::ChunkStore;
use crate::error::{LifecycleError, LifecycleResult};
use futures::StreamExt;
use spool_core::SessionKey;
use spool_storage::{FileStore, StorageError, StreamingUpload};
use std::sync::Arc;
use tracing::instrument;

/// A merged but not yet finalized artifact inside its session directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergedArtifact {
    pub key: String,
    pub size: u64,
}

pub struct MergeEngine {
    storage: Arc<dyn FileStore>,
}

impl MergeEngine {
    pub fn new(storage: Arc<dyn FileStore>) -> Self {
        Self { storage }
    }

    pub fn merged_key(key: &SessionKey, extension: &str) -> String {
        format!("{}/{key}.{extension}", ChunkStore::session_dir(key))
    }

    /// Concatenate chunks `0..total` into a single file.
    ///
    /// On a gap the partial output is discarded and
    /// [`LifecycleError::ChunkIncomplete`] names the first missing index;
    /// the chunks themselves are not touched. Chunks are removed later with
    /// the session directory, once the artifact has been placed.
    #[instrument(skip(self), fields(session = %key))]
    pub async fn merge(
        &self,
        key: &SessionKey,
        total: u32,
        extension: &str,
    ) -> LifecycleResult<MergedArtifact> {
        let target = Self::merged_key(key, extension);
        let mut output = self.storage.put_stream(&target).await?;

        for index in 0..total {
            match self.append_chunk(key, index, output.as_mut()).await {
                Ok(()) => {}
                Err(err) => {
                    if let Err(abort_err) = output.abort().await {
                        tracing::warn!(error = %abort_err, "Failed to discard partial merge output");
                    }
                    return Err(err);
                }
            }
        }

        let size = output.finish().await?;
        tracing::debug!(total, size, "Merged chunks");
        Ok(MergedArtifact { key: target, size })
    }

    async fn append_chunk(
        &self,
        key: &SessionKey,
        index: u32,
        output: &mut dyn StreamingUpload,
    ) -> LifecycleResult<()> {
        let mut chunk = match self.storage.get_stream(&ChunkStore::chunk_key(key, index)).await {
            Ok(stream) => stream,
            Err(StorageError::NotFound(_)) => {
                return Err(LifecycleError::ChunkIncomplete {
                    missing_index: index,
                });
            }
            Err(e) => return Err(e.into()),
        };
        while let Some(bytes) = chunk.next().await {
            output.write(bytes?).await?;
        }
        Ok(())
    }
}
