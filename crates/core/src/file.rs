//! File records and the canonical storage path convention.
//!
//! Artifacts live at `<root>/YYYY/MM/DD/<unique>.<ext>` and are addressed
//! publicly as `YYYYMMDD-<unique>.<ext>`. The two forms map onto each other
//! exactly.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use time::{Date, Month, OffsetDateTime, UtcOffset};

/// Calendar day an artifact is filed under (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DatePartition {
    date: Date,
}

impl DatePartition {
    pub fn of(ts: OffsetDateTime) -> Self {
        Self {
            date: ts.to_offset(UtcOffset::UTC).date(),
        }
    }

    pub fn today() -> Self {
        Self::of(OffsetDateTime::now_utc())
    }

    /// Directory key relative to the storage root, `YYYY/MM/DD`.
    pub fn dir_key(&self) -> String {
        format!(
            "{:04}/{:02}/{:02}",
            self.date.year(),
            u8::from(self.date.month()),
            self.date.day()
        )
    }

    /// Compact form used as the `uri_name` prefix, `YYYYMMDD`.
    pub fn compact(&self) -> String {
        format!(
            "{:04}{:02}{:02}",
            self.date.year(),
            u8::from(self.date.month()),
            self.date.day()
        )
    }

    fn parse_compact(s: &str) -> Option<Self> {
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year: i32 = s[0..4].parse().ok()?;
        let month: u8 = s[4..6].parse().ok()?;
        let day: u8 = s[6..8].parse().ok()?;
        let date = Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()?;
        Some(Self { date })
    }
}

/// Public identifier of a finalized artifact.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct UriName {
    partition: DatePartition,
    file_name: String,
}

impl UriName {
    /// Compose an identifier from its partition, unique base name and extension.
    pub fn new(partition: DatePartition, unique: &str, extension: &str) -> Self {
        Self {
            partition,
            file_name: format!("{unique}.{extension}"),
        }
    }

    /// Parse `YYYYMMDD-<rest>`.
    ///
    /// The rest must be a single plain path segment.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidUriName(s.to_string());
        let (date, rest) = s.split_once('-').ok_or_else(invalid)?;
        let partition = DatePartition::parse_compact(date).ok_or_else(invalid)?;
        if rest.is_empty()
            || rest.contains(['/', '\\', '\0'])
            || rest.contains("..")
            || rest.starts_with('.')
        {
            return Err(invalid());
        }
        Ok(Self {
            partition,
            file_name: rest.to_string(),
        })
    }

    pub fn partition(&self) -> DatePartition {
        self.partition
    }

    /// The `<unique>.<ext>` part.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Storage key relative to the root, `YYYY/MM/DD/<unique>.<ext>`.
    pub fn relative_path(&self) -> String {
        format!("{}/{}", self.partition.dir_key(), self.file_name)
    }
}

impl fmt::Display for UriName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.partition.compact(), self.file_name)
    }
}

impl fmt::Debug for UriName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UriName({self})")
    }
}

/// Metadata for a finalized artifact that has not been stored yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Original client-supplied file name.
    pub name: String,
    /// Bytes on disk.
    pub size: u64,
    /// Absolute filesystem path.
    pub path: String,
    /// Lowercase, no leading dot.
    pub extension: String,
    pub uri_name: String,
    pub is_temp: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub create_time: OffsetDateTime,
    /// Owning entity, empty when unlinked.
    pub link_id: String,
}

impl FileRecord {
    pub fn is_linked(&self) -> bool {
        !self.link_id.is_empty()
    }
}
