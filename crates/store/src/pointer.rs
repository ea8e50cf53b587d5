//! Index pointer read/write.
//!
//! Pointers are whole-file replacements keyed by track id; with the
//! single-worker queue each track is written by at most one job at a
//! time, so no locking beyond the atomic rename is needed.

use crate::error::{StoreError, StoreResult};
use crate::write::write_canonical;
use echo_core::{IndexPointer, cas, is_safe_track_id};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Write the "latest artifact" pointer for a track.
///
/// Returns the path of the pointer file.
pub async fn write_pointer(
    root: &Path,
    track_id: &str,
    config_hash: &str,
    source_hash: &str,
    etag: &str,
    artifact_name: &str,
    manifest_name: &str,
) -> StoreResult<PathBuf> {
    if !is_safe_track_id(track_id) {
        return Err(StoreError::InvalidTrackId(track_id.to_string()));
    }

    let pointer = IndexPointer::new(
        track_id,
        config_hash,
        source_hash,
        etag,
        artifact_name,
        manifest_name,
    );
    let path = cas::index_path(root, track_id);
    write_canonical(&path, &serde_json::to_value(&pointer)?).await?;

    tracing::debug!(track_id = %track_id, etag = %etag, "index pointer written");
    Ok(path)
}

/// Load the pointer for a track.
///
/// Returns `None` when the file is absent or corrupt — a stale or
/// damaged pointer is indistinguishable from no pointer.
pub async fn read_pointer(root: &Path, track_id: &str) -> Option<Value> {
    if !is_safe_track_id(track_id) {
        return None;
    }
    let path = cas::index_path(root, track_id);
    let bytes = fs::read(&path).await.ok()?;
    serde_json::from_slice(&bytes).ok()
}
