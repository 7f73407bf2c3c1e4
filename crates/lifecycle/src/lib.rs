//! Chunk assembly and file lifecycle management for spool.
//!
//! Uploads arrive as numbered chunks. [`ChunkStore`] persists them under a
//! per-session temp directory, [`MergeEngine`] concatenates them in order,
//! and [`ArtifactPlacer`] moves the result to its date-partitioned home and
//! produces a temp [`FileRecord`](spool_core::FileRecord). [`UploadService`]
//! drives those steps and serializes completion per session.
//!
//! [`LifecycleManager`] then owns the record: linking it to an owner,
//! demoting it back to temp, and deleting it. [`Sweeper`] reclaims chunk
//! sessions that were abandoned.

pub mod chunks;
pub mod error;
pub mod manager;
pub mod merge;
pub mod placer;
pub mod stats;
pub mod sweeper;
pub mod uploads;

pub use chunks::ChunkStore;
pub use error::{LifecycleError, LifecycleResult};
pub use manager::LifecycleManager;
pub use merge::{MergeEngine, MergedArtifact};
pub use placer::ArtifactPlacer;
pub use stats::GcStats;
pub use sweeper::Sweeper;
pub use uploads::{ChunkUpload, UploadService};
