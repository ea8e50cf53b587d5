//! Index pointer records.

use crate::cas::artifact_url;
use serde::{Deserialize, Serialize};

/// Mutable "latest artifact for a track" record.
///
/// Overwritten each time a job for the track completes successfully;
/// last writer wins.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexPointer {
    pub track_id: String,
    pub config_hash: String,
    pub source_hash: String,
    /// URL path of the latest validated artifact.
    pub artifact: String,
    /// URL path of its manifest.
    pub manifest: String,
    pub etag: String,
}

impl IndexPointer {
    /// Build a pointer for the given CAS coordinates.
    pub fn new(
        track_id: &str,
        config_hash: &str,
        source_hash: &str,
        etag: &str,
        artifact_name: &str,
        manifest_name: &str,
    ) -> Self {
        Self {
            track_id: track_id.to_string(),
            config_hash: config_hash.to_string(),
            source_hash: source_hash.to_string(),
            artifact: artifact_url(config_hash, source_hash, artifact_name),
            manifest: artifact_url(config_hash, source_hash, manifest_name),
            etag: etag.to_string(),
        }
    }
}
