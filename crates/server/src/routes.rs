//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.server.max_request_bytes;

    let api_routes = Router::new()
        // Health check (unauthenticated for load balancers and probes)
        .route("/v1/health", get(handlers::health_check))
        .route("/v1/uploads", post(handlers::upload_chunk))
        .route(
            "/v1/files/{uri_name}",
            get(handlers::get_file).delete(handlers::delete_file),
        )
        .route("/v1/links/{link_id}", delete(handlers::delete_link))
        .route("/v1/links/{link_id}/files", put(handlers::link_files))
        .route("/v1/links/{link_id}/content", put(handlers::link_content))
        .route("/v1/admin/gc", post(handlers::trigger_gc));

    let mut router = Router::new().merge(api_routes);

    // When enabled, /metrics must be network-restricted to scraper addresses.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router
        // Applies to the Json and Multipart extractors; an overrun surfaces as
        // a size-exceeded transfer fault on uploads.
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
