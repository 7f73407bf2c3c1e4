//! Repository collaborator for spool.
//!
//! This crate provides the durable file-record model:
//! - `FileRow`, the stored form of a finalized artifact's metadata
//! - `FileRepo`, predicate-based insert/update/delete/find over records
//! - A SQLite implementation parameterized by table name

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use models::FileRow;
pub use repos::{FileChanges, FileFilter, FileRepo};
pub use store::{MetadataStore, SqliteStore};

use spool_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    config.validate().map_err(MetadataError::Config)?;
    let store = SqliteStore::new(&config.path, &config.table, config.query_timeout_secs).await?;
    Ok(Arc::new(store) as Arc<dyn MetadataStore>)
}
