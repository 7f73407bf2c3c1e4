//! Repository traits for metadata operations.

pub mod files;

pub use files::{FileChanges, FileFilter, FileRepo};
