//! Database models mapping to the metadata schema.

use serde::Serialize;
use spool_core::FileRecord;
use sqlx::FromRow;
use time::OffsetDateTime;

/// Stored file record.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct FileRow {
    pub id: i64,
    pub name: String,
    pub size: i64,
    pub path: String,
    pub extension: String,
    pub uri_name: String,
    pub is_temp: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub create_time: OffsetDateTime,
    pub link_id: String,
}

impl FileRow {
    pub fn is_linked(&self) -> bool {
        !self.link_id.is_empty()
    }

    /// Size in bytes, clamping a corrupt negative value to zero.
    pub fn size_bytes(&self) -> u64 {
        u64::try_from(self.size).unwrap_or(0)
    }
}

impl From<FileRow> for FileRecord {
    fn from(row: FileRow) -> Self {
        let size = row.size_bytes();
        Self {
            name: row.name,
            size,
            path: row.path,
            extension: row.extension,
            uri_name: row.uri_name,
            is_temp: row.is_temp,
            create_time: row.create_time,
            link_id: row.link_id,
        }
    }
}
