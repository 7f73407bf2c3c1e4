//! HTTP front end for spool.
//!
//! This crate provides the request layer over `spool-lifecycle`:
//! - Chunked upload intake
//! - File record lookup and owner-checked deletion
//! - Link management (explicit name sets or referencing content)
//! - Garbage collection scheduling and the admin trigger
//! - Health and Prometheus metrics endpoints

pub mod error;
pub mod gc;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use gc::{GcReport, run_gc, spawn_scheduler};
pub use routes::create_router;
pub use state::AppState;
