//! Manifest structure.
//!
//! The manifest is the trust root for its sibling artifact: an artifact
//! is only considered valid while its live hash matches the manifest's
//! recorded `artifact.sha256`.

use serde::{Deserialize, Serialize};

/// Manifest record co-located with an artifact in the CAS.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Manifest {
    /// Schema id of the manifest itself.
    pub schema_id: String,
    /// Canonical hash of the input payload.
    pub source_hash: String,
    /// Canonical hash of the computation parameters.
    pub config_hash: String,
    /// File-level hash of the auxiliary reference database, if computed.
    pub db_hash: Option<String>,
    /// Identity of the runner that produced the artifact.
    pub runner: RunnerInfo,
    /// The artifact sub-record.
    pub artifact: ArtifactRef,
}

/// Runner identity and input provenance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunnerInfo {
    pub runner_name: String,
    pub version: String,
    pub input_features_path: String,
}

/// Recorded artifact location, hash and size.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Filename relative to the manifest's directory.
    pub path: String,
    /// SHA-256 of the artifact bytes at write time.
    pub sha256: String,
    /// Opaque HTTP validator; equals `sha256` in this layout.
    pub etag: String,
    /// Artifact size in bytes.
    pub size: u64,
}
