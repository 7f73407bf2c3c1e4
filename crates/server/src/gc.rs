//! Garbage collection runs and the periodic scheduler.

use crate::metrics;
use crate::state::AppState;
use serde::Serialize;
use spool_lifecycle::GcStats;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Combined result of one GC run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GcReport {
    /// Expired temp files.
    pub temp_files: GcStats,
    /// Abandoned upload sessions.
    pub sessions: GcStats,
    /// Completed-session entries forgotten.
    pub sessions_forgotten: usize,
}

/// Run both sweeps once, then forget stale completed sessions.
///
/// A failing sweep is logged and counted in its stats; it never prevents
/// the steps after it.
pub async fn run_gc(state: &AppState) -> GcReport {
    let start = Instant::now();

    let temp_files = match state.files.remove_temp_files().await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!(error = %e, "Temp file sweep failed");
            GcStats {
                errors: 1,
                ..GcStats::default()
            }
        }
    };
    metrics::record_temp_sweep(&temp_files);

    let sessions = match state.sweeper.reclaim_abandoned_sessions().await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!(error = %e, "Session sweep failed");
            GcStats {
                errors: 1,
                ..GcStats::default()
            }
        }
    };
    metrics::record_session_sweep(&sessions);

    let sessions_forgotten = state.uploads.prune_sessions();

    metrics::GC_RUN_DURATION.observe(start.elapsed().as_secs_f64());
    tracing::info!(
        temp_files_deleted = temp_files.items_deleted,
        sessions_deleted = sessions.items_deleted,
        bytes_reclaimed = temp_files.bytes_reclaimed + sessions.bytes_reclaimed,
        errors = temp_files.errors + sessions.errors,
        "GC run finished"
    );

    GcReport {
        temp_files,
        sessions,
        sessions_forgotten,
    }
}

/// Run GC every `interval` until the task is dropped or aborted.
pub fn spawn_scheduler(state: AppState, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(interval_secs = interval.as_secs(), "Automatic GC scheduler enabled");
        loop {
            tokio::time::sleep(interval).await;
            run_gc(&state).await;
        }
    })
}
