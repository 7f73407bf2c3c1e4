use serde::Serialize;

/// Outcome of one garbage collection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GcStats {
    /// Number of items examined.
    pub items_processed: u64,
    /// Number of items deleted.
    pub items_deleted: u64,
    /// Bytes reclaimed from disk.
    pub bytes_reclaimed: u64,
    /// Per-item failures that were logged and skipped.
    pub errors: u64,
}
