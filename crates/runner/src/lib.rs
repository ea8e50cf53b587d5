//! Runner adapter for the echo artifact broker.
//!
//! The broker treats the domain computation as an opaque capability: a
//! [`Probe`] receives the feature payload path plus options and returns
//! a JSON object. The [`EchoRunner`] adapter wraps a probe, stamps
//! provenance metadata, and writes the canonical artifact + manifest
//! pair into the content-addressed layout. The queue only ever sees the
//! [`Runner`] trait.

pub mod adapter;
pub mod error;
pub mod probe;

use async_trait::async_trait;
use echo_core::JobParams;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub use adapter::EchoRunner;
pub use error::{RunnerError, RunnerResult};
pub use probe::PassthroughProbe;

/// Paths written by one runner invocation.
#[derive(Clone, Debug)]
pub struct RunOutput {
    pub artifact: PathBuf,
    pub manifest: PathBuf,
}

/// The injected domain computation.
///
/// Receives the features path, the optional auxiliary database path and
/// opaque keyword options; must return a JSON object. The broker never
/// inspects the result beyond adding provenance fields.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(
        &self,
        features_path: &Path,
        db_path: Option<&Path>,
        kwargs: &Map<String, Value>,
    ) -> RunnerResult<Value>;
}

/// Capability the job queue invokes to produce one artifact.
#[async_trait]
pub trait Runner: Send + Sync {
    async fn run(&self, params: &JobParams) -> RunnerResult<RunOutput>;
}
