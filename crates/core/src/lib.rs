//! Core domain types shared by every spool crate.
//!
//! This crate defines the data model of the chunk-assembly and file-lifecycle
//! service and performs no I/O:
//! - Upload session keys, chunk coordinates and upload outcomes
//! - Transfer faults and rejection reasons
//! - File records and the `uri_name` / date-partitioned path convention
//! - Content reference extraction
//! - Configuration

pub mod config;
pub mod error;
pub mod file;
pub mod reference;
pub mod upload;

pub use error::{Error, Result};
pub use file::{DatePartition, FileRecord, UriName};
pub use reference::ExtractorRegistry;
pub use upload::{
    ChunkCoordinates, RejectReason, SessionKey, TransferFault, UploadOutcome, extension_of,
};

/// Name of the directory under the storage root holding in-progress sessions.
pub const TEMP_DIR: &str = "temp";

/// Default retention for unlinked file records: 12 hours.
pub const DEFAULT_TEMP_FILE_RETENTION_SECS: u64 = 12 * 60 * 60;

/// Default retention for abandoned chunk sessions: 24 hours.
pub const DEFAULT_SESSION_RETENTION_SECS: u64 = 24 * 60 * 60;
