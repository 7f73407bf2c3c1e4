//! File record repository.

use crate::error::MetadataResult;
use crate::models::FileRow;
use async_trait::async_trait;
use spool_core::FileRecord;
use time::OffsetDateTime;

/// Conjunction of equality and comparison predicates over file records.
///
/// Unset fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileFilter {
    pub id: Option<i64>,
    pub uri_name: Option<String>,
    pub uri_names: Option<Vec<String>>,
    pub path: Option<String>,
    pub link_id: Option<String>,
    pub is_temp: Option<bool>,
    pub created_before: Option<OffsetDateTime>,
}

impl FileFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn uri_name(mut self, uri_name: impl Into<String>) -> Self {
        self.uri_name = Some(uri_name.into());
        self
    }

    /// Match any of the given names. An empty list matches nothing.
    pub fn uri_names(mut self, uri_names: Vec<String>) -> Self {
        self.uri_names = Some(uri_names);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn link_id(mut self, link_id: impl Into<String>) -> Self {
        self.link_id = Some(link_id.into());
        self
    }

    pub fn is_temp(mut self, is_temp: bool) -> Self {
        self.is_temp = Some(is_temp);
        self
    }

    pub fn created_before(mut self, cutoff: OffsetDateTime) -> Self {
        self.created_before = Some(cutoff);
        self
    }

    /// True when the filter would match every row.
    pub fn is_unbounded(&self) -> bool {
        *self == Self::default()
    }
}

/// Field assignments applied by `update_files`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileChanges {
    pub is_temp: Option<bool>,
    pub link_id: Option<String>,
}

impl FileChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_temp(mut self, is_temp: bool) -> Self {
        self.is_temp = Some(is_temp);
        self
    }

    pub fn link_id(mut self, link_id: impl Into<String>) -> Self {
        self.link_id = Some(link_id.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.is_temp.is_none() && self.link_id.is_none()
    }
}

/// Repository for file records.
#[async_trait]
pub trait FileRepo: Send + Sync {
    /// Insert a record. Fails with `AlreadyExists` on a duplicate `uri_name`.
    async fn insert_file(&self, record: &FileRecord) -> MetadataResult<FileRow>;

    /// Apply `changes` to every matching row. Returns the number of rows changed.
    ///
    /// An unbounded filter is refused.
    async fn update_files(&self, filter: &FileFilter, changes: &FileChanges)
    -> MetadataResult<u64>;

    /// Delete every matching row. Returns the number of rows deleted.
    ///
    /// An unbounded filter is refused.
    async fn delete_files(&self, filter: &FileFilter) -> MetadataResult<u64>;

    /// First matching row by id.
    async fn find_file(&self, filter: &FileFilter) -> MetadataResult<Option<FileRow>>;

    /// All matching rows ordered by id.
    async fn find_files(&self, filter: &FileFilter) -> MetadataResult<Vec<FileRow>>;

    /// Make `uri_names` the exact set of permanent records owned by `link_id`.
    ///
    /// Records previously owned by `link_id` but not named are demoted to
    /// temp with their `link_id` left in place. Returns the number adopted.
    ///
    /// The default runs detach then adopt as two statements. A crash between
    /// them leaves the targets temp, which is safe to retry.
    async fn relink_files(&self, link_id: &str, uri_names: &[String]) -> MetadataResult<u64> {
        self.update_files(
            &FileFilter::new().link_id(link_id).is_temp(false),
            &FileChanges::new().is_temp(true),
        )
        .await?;
        if uri_names.is_empty() {
            return Ok(0);
        }
        self.update_files(
            &FileFilter::new().uri_names(uri_names.to_vec()),
            &FileChanges::new().is_temp(false).link_id(link_id),
        )
        .await
    }
}
