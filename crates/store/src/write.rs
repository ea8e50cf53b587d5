//! Atomic file writes.

use crate::error::StoreResult;
use echo_core::canonical_bytes;
use serde_json::Value;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Write bytes to `path` atomically.
///
/// Writes to a sibling temp file with a unique name, fsyncs, then
/// renames into place so concurrent readers never observe a partial
/// file. Parent directories are created as needed.
pub async fn write_atomic(path: &Path, data: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    // Unique temp name so concurrent writers to the same key cannot
    // collide; writers of the same content-addressed path produce
    // byte-identical content anyway.
    let temp_name = format!(".tmp.{}", Uuid::new_v4());
    let temp_path = path.with_file_name(
        path.file_name()
            .map(|n| format!("{}{}", n.to_string_lossy(), temp_name))
            .unwrap_or_else(|| temp_name.clone()),
    );
    {
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
    }
    fs::rename(&temp_path, path).await?;

    Ok(())
}

/// Serialize a value to canonical bytes and write it atomically.
///
/// Returns the number of bytes written.
pub async fn write_canonical(path: &Path, value: &Value) -> StoreResult<u64> {
    let bytes = canonical_bytes(value);
    write_atomic(path, &bytes).await?;
    Ok(bytes.len() as u64)
}
