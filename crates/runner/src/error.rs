//! Runner error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the runner adapter or the injected probe.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("features file not found: {0}")]
    FeaturesNotFound(PathBuf),

    #[error("probe failed: {0}")]
    Probe(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid features payload: {0}")]
    InvalidFeatures(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(#[from] echo_store::StoreError),

    #[error("timestamp format error: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// Result type for runner operations.
pub type RunnerResult<T> = std::result::Result<T, RunnerError>;
