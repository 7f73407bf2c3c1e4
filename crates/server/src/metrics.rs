//! Prometheus metrics for the spool server.
//!
//! The `/metrics` endpoint is unauthenticated so that Prometheus can scrape
//! it. It exposes aggregate counts only, never file names or link ids.
//! Restrict it to scraper addresses at the network level.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use spool_lifecycle::GcStats;
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Upload metrics
pub static CHUNKS_STORED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("spool_chunks_stored_total", "Total number of chunks accepted")
        .expect("metric creation failed")
});

pub static BYTES_UPLOADED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "spool_bytes_uploaded_total",
        "Total payload bytes received in accepted chunks",
    )
    .expect("metric creation failed")
});

pub static UPLOADS_COMPLETED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "spool_uploads_completed_total",
        "Total number of uploads assembled into a final artifact",
    )
    .expect("metric creation failed")
});

pub static UPLOAD_ERRORS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "spool_upload_errors_total",
            "Total upload errors by error type",
        ),
        &["error_type"],
    )
    .expect("metric creation failed")
});

pub static CHUNK_UPLOAD_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "spool_chunk_upload_duration_seconds",
            "Time taken to handle a single chunk, including any merge",
        )
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
    )
    .expect("metric creation failed")
});

// GC metrics
pub static TEMP_FILES_RECLAIMED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "spool_gc_temp_files_reclaimed_total",
        "Total number of expired temp files deleted",
    )
    .expect("metric creation failed")
});

pub static SESSIONS_RECLAIMED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "spool_gc_sessions_reclaimed_total",
        "Total number of abandoned upload sessions deleted",
    )
    .expect("metric creation failed")
});

pub static GC_BYTES_RECLAIMED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "spool_gc_bytes_reclaimed_total",
        "Total bytes freed by garbage collection",
    )
    .expect("metric creation failed")
});

pub static GC_ERRORS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "spool_gc_errors_total",
        "Total number of items garbage collection failed to delete",
    )
    .expect("metric creation failed")
});

pub static GC_RUN_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "spool_gc_run_duration_seconds",
            "Time taken by one garbage collection run",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]),
    )
    .expect("metric creation failed")
});

/// Guard to ensure metrics are only registered once.
static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Idempotent, so tests may build several routers in one process.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        let collectors: [Box<dyn prometheus::core::Collector>; 10] = [
            Box::new(CHUNKS_STORED.clone()),
            Box::new(BYTES_UPLOADED.clone()),
            Box::new(UPLOADS_COMPLETED.clone()),
            Box::new(UPLOAD_ERRORS.clone()),
            Box::new(CHUNK_UPLOAD_DURATION.clone()),
            Box::new(TEMP_FILES_RECLAIMED.clone()),
            Box::new(SESSIONS_RECLAIMED.clone()),
            Box::new(GC_BYTES_RECLAIMED.clone()),
            Box::new(GC_ERRORS.clone()),
            Box::new(GC_RUN_DURATION.clone()),
        ];
        for collector in collectors {
            REGISTRY
                .register(collector)
                .expect("metric registration failed");
        }
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Helper to record upload errors by type.
pub fn record_upload_error(error_type: &str) {
    UPLOAD_ERRORS.with_label_values(&[error_type]).inc();
}

/// Fold temp file sweep statistics into the GC counters.
pub fn record_temp_sweep(stats: &GcStats) {
    TEMP_FILES_RECLAIMED.inc_by(stats.items_deleted);
    GC_BYTES_RECLAIMED.inc_by(stats.bytes_reclaimed);
    GC_ERRORS.inc_by(stats.errors);
}

/// Fold session sweep statistics into the GC counters.
pub fn record_session_sweep(stats: &GcStats) {
    SESSIONS_RECLAIMED.inc_by(stats.items_deleted);
    GC_BYTES_RECLAIMED.inc_by(stats.bytes_reclaimed);
    GC_ERRORS.inc_by(stats.errors);
}
