//! Administrative endpoints.

use crate::gc::{GcReport, run_gc};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;

/// POST /v1/admin/gc - Run both sweeps now.
///
/// Sweep failures are reported through the `errors` counts, not the status.
pub async fn trigger_gc(State(state): State<AppState>) -> Json<GcReport> {
    tracing::info!("Manual GC run requested");
    Json(run_gc(&state).await)
}
