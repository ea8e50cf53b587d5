//! Content-addressed path layout.
//!
//! Objects live at `<root>/echo/<config_hash>/<source_hash>/<filename>`.
//! `config_hash` captures how a result was computed, `source_hash` what
//! was computed; changing either yields a fresh address.

use crate::CAS_PREFIX;
use std::path::{Path, PathBuf};

/// Build the on-disk path for a content-addressed object.
pub fn cas_path(root: &Path, config_hash: &str, source_hash: &str, filename: &str) -> PathBuf {
    root.join(CAS_PREFIX)
        .join(config_hash)
        .join(source_hash)
        .join(filename)
}

/// Build the on-disk path for an index pointer file.
pub fn index_path(root: &Path, track_id: &str) -> PathBuf {
    root.join(CAS_PREFIX)
        .join("index")
        .join(format!("{track_id}.json"))
}

/// Build the URL path under which a CAS object is served.
pub fn artifact_url(config_hash: &str, source_hash: &str, filename: &str) -> String {
    format!("/{CAS_PREFIX}/{config_hash}/{source_hash}/{filename}")
}

/// Check whether a string is safe to use as a single path component
/// under the CAS root.
///
/// Config hashes may be caller-supplied opaque strings, so this rejects
/// traversal shapes rather than enforcing a hash syntax. User-shaped
/// request segments never reach the filesystem without passing this.
pub fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.contains('/')
        && !segment.contains('\\')
        && segment != "."
        && segment != ".."
        && !segment.contains('\0')
}

/// Check whether a track id is safe to use as an index filename.
pub fn is_safe_track_id(track_id: &str) -> bool {
    is_safe_segment(track_id)
}
