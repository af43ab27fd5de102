//! # Artifact Existence Checker
//!
//! The sole gate between "cached" and "recompute".
//!
//! Existence is trusted as validity: a file left behind by an interrupted
//! write is indistinguishable from a complete one. No checksum and no
//! write-then-rename is used.

use crate::PipelineError;
use std::path::Path;

/// Returns `true` iff every path exists at call time.
///
/// An empty set is trivially satisfied. No side effects.
pub fn all_exist<P: AsRef<Path>>(paths: &[P]) -> bool {
    paths.iter().all(|p| p.as_ref().exists())
}

/// Create `dir` and its parents if absent.
///
/// Idempotent. Returns `true` if the directory had to be created.
pub fn ensure_dir(dir: &Path) -> Result<bool, PipelineError> {
    if dir.is_dir() {
        return Ok(false);
    }

    tracing::info!("Creating directory: {}", dir.display());
    std::fs::create_dir_all(dir).map_err(|e| {
        PipelineError::IoError(format!("Cannot create directory '{}': {}", dir.display(), e))
    })?;
    Ok(true)
}
