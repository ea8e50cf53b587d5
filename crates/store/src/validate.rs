//! Artifact/manifest validation.
//!
//! The sole gate on trusting stored bytes: called on every artifact
//! read and once per job completion.

use echo_core::sha256_hex;
use serde_json::Value;
use std::path::Path;
use tokio::fs;

/// Outcome of validating an artifact against its manifest.
#[derive(Clone, Debug)]
pub struct Validation {
    /// Whether the artifact's live hash matches the manifest's record.
    pub ok: bool,
    /// ETag recorded in the manifest, when present.
    pub etag: Option<String>,
    /// Parsed manifest contents; `{}` when missing or unparsable.
    ///
    /// Returned regardless of `ok` so callers can still log or report
    /// manifest contents on failure.
    pub manifest: Value,
}

impl Validation {
    fn failed() -> Self {
        Self {
            ok: false,
            etag: None,
            manifest: Value::Object(serde_json::Map::new()),
        }
    }
}

/// Recompute the artifact's hash and compare it against the manifest.
///
/// Never fails: missing files, unreadable files and unparsable
/// manifests all degrade to `ok=false` with an empty manifest.
pub async fn validate(artifact_path: &Path, manifest_path: &Path) -> Validation {
    let manifest_bytes = match fs::read(manifest_path).await {
        Ok(bytes) => bytes,
        Err(_) => return Validation::failed(),
    };
    let manifest: Value = match serde_json::from_slice(&manifest_bytes) {
        Ok(value) => value,
        Err(_) => return Validation::failed(),
    };

    let artifact_bytes = match fs::read(artifact_path).await {
        Ok(bytes) => bytes,
        Err(_) => return Validation::failed(),
    };

    let expected = manifest
        .get("artifact")
        .and_then(|a| a.get("sha256"))
        .and_then(Value::as_str);
    let etag = manifest
        .get("artifact")
        .and_then(|a| a.get("etag"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let actual = sha256_hex(&artifact_bytes);
    let ok = expected == Some(actual.as_str());

    Validation { ok, etag, manifest }
}
