//! File record lifecycle: linking, demotion and deletion.
//!
//! Every removal path deletes the file on disk before the record, and a file
//! that is already gone counts as reclaimed.

use crate::error::{LifecycleError, LifecycleResult};
use crate::stats::GcStats;
use spool_core::{ExtractorRegistry, FileRecord};
use spool_metadata::{FileFilter, FileRow, MetadataStore};
use spool_storage::FileStore;
use std::path::Path;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tracing::instrument;

pub struct LifecycleManager {
    metadata: Arc<dyn MetadataStore>,
    storage: Arc<dyn FileStore>,
    extractors: ExtractorRegistry,
    temp_retention: Duration,
}

impl LifecycleManager {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        storage: Arc<dyn FileStore>,
        temp_retention: Duration,
    ) -> Self {
        Self {
            metadata,
            storage,
            extractors: ExtractorRegistry::with_defaults(),
            temp_retention,
        }
    }

    /// Replace the reference extractors (defaults: markdown, html).
    pub fn with_extractors(mut self, extractors: ExtractorRegistry) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn extractors(&self) -> &ExtractorRegistry {
        &self.extractors
    }

    pub fn temp_retention(&self) -> Duration {
        self.temp_retention
    }

    /// Persist a freshly finalized record.
    pub async fn register(&self, record: &FileRecord) -> LifecycleResult<FileRow> {
        Ok(self.metadata.insert_file(record).await?)
    }

    /// Make `uri_names` the exact set of files permanently linked to `link_id`.
    ///
    /// Files previously linked to `link_id` but not named are demoted to temp
    /// rather than deleted. Blank names are skipped. Returns the number of
    /// records adopted.
    #[instrument(skip(self, uri_names), fields(count = uri_names.len()))]
    pub async fn use_files<S: AsRef<str> + Sync>(
        &self,
        uri_names: &[S],
        link_id: &str,
    ) -> LifecycleResult<u64> {
        if link_id.trim().is_empty() {
            return Err(spool_core::Error::EmptyLinkId.into());
        }
        let names: Vec<String> = uri_names
            .iter()
            .map(|name| name.as_ref().trim())
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();

        let adopted = self.metadata.relink_files(link_id, &names).await?;
        tracing::debug!(adopted, "Relinked files");
        Ok(adopted)
    }

    pub async fn use_file(&self, uri_name: &str, link_id: &str) -> LifecycleResult<u64> {
        self.use_files(&[uri_name], link_id).await
    }

    /// Basenames of the resources `content` references, in order.
    pub fn extract_references(&self, content: &str, syntax: &str) -> LifecycleResult<Vec<String>> {
        Ok(self.extractors.extract(content, syntax)?)
    }

    /// Link exactly the files `content` references to `link_id`.
    pub async fn use_content(
        &self,
        content: &str,
        syntax: &str,
        link_id: &str,
    ) -> LifecycleResult<Vec<String>> {
        let names = self.extract_references(content, syntax)?;
        self.use_files(&names, link_id).await?;
        Ok(names)
    }

    /// Delete a linked file and its record.
    ///
    /// Unlinked files are left alone so that a just-uploaded file cannot be
    /// removed through this path. Returns whether anything was deleted.
    #[instrument(skip(self))]
    pub async fn remove_file(&self, uri_name: &str) -> LifecycleResult<bool> {
        let Some(row) = self.lookup(uri_name).await? else {
            return Ok(false);
        };
        if !row.is_linked() {
            tracing::debug!("Skipping removal of unlinked file");
            return Ok(false);
        }
        self.delete_row(&row, FileFilter::new().id(row.id)).await?;
        Ok(true)
    }

    /// [`remove_file`](Self::remove_file) on behalf of an owner.
    ///
    /// Fails with [`LifecycleError::Unauthorized`] if the file belongs to
    /// someone else.
    pub async fn remove_owned_file(
        &self,
        uri_name: &str,
        caller_link_id: &str,
    ) -> LifecycleResult<bool> {
        let Some(row) = self.lookup(uri_name).await? else {
            return Ok(false);
        };
        if row.link_id != caller_link_id {
            return Err(LifecycleError::Unauthorized);
        }
        if !row.is_linked() {
            return Ok(false);
        }
        self.delete_row(&row, FileFilter::new().id(row.id)).await?;
        Ok(true)
    }

    /// Delete every file linked to `link_id`, temp or not.
    ///
    /// Used when the owning entity itself goes away. An empty `link_id` is a
    /// no-op. Per-file failures are logged and skipped.
    #[instrument(skip(self))]
    pub async fn remove_files(&self, link_id: &str) -> LifecycleResult<GcStats> {
        let mut stats = GcStats::default();
        if link_id.is_empty() {
            return Ok(stats);
        }

        let rows = self
            .metadata
            .find_files(&FileFilter::new().link_id(link_id))
            .await?;
        for row in rows {
            stats.items_processed += 1;
            match self.delete_row(&row, FileFilter::new().id(row.id)).await {
                Ok(bytes) => {
                    stats.items_deleted += 1;
                    stats.bytes_reclaimed += bytes;
                }
                Err(e) => {
                    stats.errors += 1;
                    tracing::warn!(
                        uri_name = %row.uri_name,
                        error = %e,
                        "Failed to remove linked file, skipping"
                    );
                }
            }
        }

        tracing::info!(
            items_deleted = stats.items_deleted,
            errors = stats.errors,
            "Removed files for link"
        );
        Ok(stats)
    }

    /// Delete temp files older than the retention window.
    pub async fn remove_temp_files(&self) -> LifecycleResult<GcStats> {
        match OffsetDateTime::now_utc().checked_sub(self.temp_retention) {
            Some(cutoff) => self.remove_temp_files_before(cutoff).await,
            // Nothing can be older than a window reaching past the calendar.
            None => Ok(GcStats::default()),
        }
    }

    /// Delete temp files created before `cutoff`.
    ///
    /// Each row is re-checked and deleted under the same predicate, so a
    /// file adopted while the sweep runs is kept.
    #[instrument(skip(self))]
    pub async fn remove_temp_files_before(
        &self,
        cutoff: OffsetDateTime,
    ) -> LifecycleResult<GcStats> {
        let eligible = FileFilter::new().is_temp(true).created_before(cutoff);
        let rows = self.metadata.find_files(&eligible).await?;

        let mut stats = GcStats::default();
        for row in rows {
            stats.items_processed += 1;
            let guard = eligible.clone().id(row.id);
            match self.metadata.find_file(&guard).await {
                Ok(Some(_)) => {}
                Ok(None) => continue,
                Err(e) => {
                    stats.errors += 1;
                    tracing::warn!(uri_name = %row.uri_name, error = %e, "Failed to recheck temp file, skipping");
                    continue;
                }
            }
            match self.delete_row(&row, guard).await {
                Ok(bytes) => {
                    stats.items_deleted += 1;
                    stats.bytes_reclaimed += bytes;
                }
                Err(e) => {
                    stats.errors += 1;
                    tracing::warn!(
                        uri_name = %row.uri_name,
                        path = %row.path,
                        error = %e,
                        "Failed to remove expired temp file, skipping"
                    );
                }
            }
        }

        if stats.items_processed > 0 {
            tracing::info!(
                items_deleted = stats.items_deleted,
                bytes_reclaimed = stats.bytes_reclaimed,
                errors = stats.errors,
                "Removed expired temp files"
            );
        }
        Ok(stats)
    }

    pub async fn lookup(&self, uri_name: &str) -> LifecycleResult<Option<FileRow>> {
        Ok(self
            .metadata
            .find_file(&FileFilter::new().uri_name(uri_name))
            .await?)
    }

    pub async fn lookup_by_path(&self, path: impl AsRef<Path>) -> LifecycleResult<Option<FileRow>> {
        let path = path.as_ref().to_string_lossy();
        Ok(self
            .metadata
            .find_file(&FileFilter::new().path(path))
            .await?)
    }

    /// Delete the file, then the record matching `guard`. Returns bytes freed.
    async fn delete_row(&self, row: &FileRow, guard: FileFilter) -> LifecycleResult<u64> {
        let key = self.storage.key_for_path(Path::new(&row.path))?;
        let existed = self.storage.delete(&key).await?;
        if !existed {
            tracing::debug!(uri_name = %row.uri_name, "File already absent, removing record");
        }
        self.metadata.delete_files(&guard).await?;
        Ok(if existed { row.size_bytes() } else { 0 })
    }
}
