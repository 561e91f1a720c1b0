//! Storage layer: C6 (vector+text), C7 (graph), C8 (cache), C9 (project).
//!
//! Each store is an in-process `DashMap`/`RwLock` structure snapshotted to
//! disk via atomic temp-file-then-rename writes, following the teacher's
//! `RepoState`/`ServerState` shape rather than introducing a database
//! dependency it doesn't use (see `DESIGN.md`).

pub mod cache;
pub mod graph;
pub mod project;
pub mod vector_text;

use std::io::Write;
use std::path::Path;

use crate::error::{CodeSeekerError, Result};

/// Serialize `value` to JSON and write it to `path` atomically: write to a
/// sibling temp file, then rename over the destination. Used by every
/// store's `flush()` and by the exclusions file, per spec §5's "atomic
/// read-mutate-write-whole-file" requirement.
pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("json")
    ));
    let json = serde_json::to_vec_pretty(value)?;
    {
        let mut f = std::fs::File::create(&tmp_path)?;
        f.write_all(&json)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp_path, path).map_err(|e| {
        CodeSeekerError::io(format!("failed to rename snapshot into place: {e}"))
    })?;
    Ok(())
}

/// Read and deserialize a JSON snapshot, returning `None` if the file does
/// not exist yet (first run).
pub fn read_json_if_exists<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path)?;
    let value = serde_json::from_slice(&bytes)?;
    Ok(Some(value))
}
