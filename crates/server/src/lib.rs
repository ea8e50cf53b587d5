//! HTTP broker for content-addressed echo artifacts.
//!
//! This crate provides the client-facing surface:
//! - Job submission and status polling
//! - Single-worker job queue driving the injected runner
//! - Artifact/manifest delivery with conditional-GET semantics
//! - Index pointer lookup
//! - Prometheus metrics

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod queue;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use queue::JobQueue;
pub use routes::create_router;
pub use state::AppState;
