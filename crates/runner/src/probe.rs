//! Built-in probes.

use crate::error::{RunnerError, RunnerResult};
use crate::Probe;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::path::Path;
use tokio::fs;

/// Probe that wraps the feature payload without computing anything.
///
/// Lets the broker binary run end-to-end without the host's domain
/// engine; deployments embed the server crate and inject their own
/// [`Probe`] implementation.
pub struct PassthroughProbe;

#[async_trait]
impl Probe for PassthroughProbe {
    async fn probe(
        &self,
        features_path: &Path,
        _db_path: Option<&Path>,
        kwargs: &Map<String, Value>,
    ) -> RunnerResult<Value> {
        let bytes = fs::read(features_path).await?;
        let features: Value = serde_json::from_slice(&bytes)
            .map_err(|e| RunnerError::Probe(format!("unreadable features payload: {e}")))?;
        Ok(json!({
            "probe": "passthrough",
            "features": features,
            "probe_kwargs": Value::Object(kwargs.clone()),
        }))
    }
}
