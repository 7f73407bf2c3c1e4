//! Reclamation of abandoned chunk sessions.

use crate::error::LifecycleResult;
use crate::stats::GcStats;
use spool_core::TEMP_DIR;
use spool_storage::FileStore;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tracing::instrument;

pub struct Sweeper {
    storage: Arc<dyn FileStore>,
    session_retention: Duration,
}

impl Sweeper {
    pub fn new(storage: Arc<dyn FileStore>, session_retention: Duration) -> Self {
        Self {
            storage,
            session_retention,
        }
    }

    pub fn session_retention(&self) -> Duration {
        self.session_retention
    }

    /// Delete session directories idle for longer than the retention window.
    pub async fn reclaim_abandoned_sessions(&self) -> LifecycleResult<GcStats> {
        match OffsetDateTime::now_utc().checked_sub(self.session_retention) {
            Some(cutoff) => self.reclaim_sessions_older_than(cutoff).await,
            None => Ok(GcStats::default()),
        }
    }

    /// Delete session directories last modified before `cutoff`.
    ///
    /// A directory's modification time moves whenever a chunk is written
    /// into it. Directories without a modification time are kept.
    #[instrument(skip(self))]
    pub async fn reclaim_sessions_older_than(
        &self,
        cutoff: OffsetDateTime,
    ) -> LifecycleResult<GcStats> {
        let mut stats = GcStats::default();
        let entries = self.storage.list_dir(TEMP_DIR).await?;

        for entry in entries.into_iter().filter(|entry| entry.is_dir) {
            stats.items_processed += 1;
            let Some(modified) = entry.last_modified else {
                tracing::warn!(session = %entry.name, "Session has no modification time, keeping");
                continue;
            };
            if modified >= cutoff {
                continue;
            }

            let key = format!("{TEMP_DIR}/{}", entry.name);
            let bytes = self.session_bytes(&key).await;
            match self.storage.delete_dir(&key).await {
                Ok(true) => {
                    stats.items_deleted += 1;
                    stats.bytes_reclaimed += bytes;
                    tracing::debug!(session = %entry.name, "Reclaimed abandoned session");
                }
                Ok(false) => {}
                Err(e) => {
                    stats.errors += 1;
                    tracing::warn!(
                        session = %entry.name,
                        error = %e,
                        "Failed to reclaim abandoned session, skipping"
                    );
                }
            }
        }

        if stats.items_deleted > 0 || stats.errors > 0 {
            tracing::info!(
                items_deleted = stats.items_deleted,
                bytes_reclaimed = stats.bytes_reclaimed,
                errors = stats.errors,
                "Reclaimed abandoned sessions"
            );
        }
        Ok(stats)
    }

    /// Best-effort size of the files directly inside a session directory.
    async fn session_bytes(&self, key: &str) -> u64 {
        let Ok(entries) = self.storage.list_dir(key).await else {
            return 0;
        };
        let mut total = 0;
        for entry in entries.iter().filter(|entry| !entry.is_dir) {
            if let Ok(meta) = self.storage.head(&format!("{key}/{}", entry.name)).await {
                total += meta.size;
            }
        }
        total
    }
}
