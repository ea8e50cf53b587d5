//! Prometheus metrics for the echo broker.
//!
//! The `/metrics` endpoint is unauthenticated to allow Prometheus
//! scraping and must be network-restricted at the infrastructure level
//! when the broker is reachable from untrusted networks.

use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static JOBS_SUBMITTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("echo_jobs_submitted_total", "Total number of jobs submitted")
        .expect("metric creation failed")
});

pub static JOBS_COMPLETED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "echo_jobs_completed_total",
        "Total number of jobs that reached the done state",
    )
    .expect("metric creation failed")
});

pub static JOBS_FAILED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "echo_jobs_failed_total",
        "Total number of jobs that reached the error state",
    )
    .expect("metric creation failed")
});

pub static QUEUE_DEPTH: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "echo_queue_depth",
        "Number of jobs submitted but not yet finished",
    )
    .expect("metric creation failed")
});

pub static ARTIFACT_BYTES_SERVED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "echo_artifact_bytes_served_total",
        "Total artifact bytes served over HTTP",
    )
    .expect("metric creation failed")
});

static REGISTER: Once = Once::new();

/// Register all metrics with the global registry. Idempotent.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        REGISTRY
            .register(Box::new(JOBS_SUBMITTED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(JOBS_COMPLETED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(JOBS_FAILED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(QUEUE_DEPTH.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(ARTIFACT_BYTES_SERVED.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus text exposition.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encoding failed: {e}"),
        )
            .into_response();
    }
    (
        StatusCode::OK,
        [(CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}
