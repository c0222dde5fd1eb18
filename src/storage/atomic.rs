//! Atomic JSON file writes.
//!
//! Writes to a temporary file in the same directory as the destination,
//! then atomically replaces the destination. Concurrent readers never
//! observe a partially written record.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::AppError;

/// Serializes `value` as JSON and atomically replaces `path` with it.
///
/// The temporary file is created in the destination's directory to satisfy
/// the same-filesystem requirement for an atomic rename. On any error the
/// temporary file is cleaned up and the destination is left untouched.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let parent = path.parent().ok_or_else(|| {
        AppError::Internal(format!(
            "Cannot determine parent directory for: {}",
            path.display()
        ))
    })?;

    let mut temp_file = NamedTempFile::new_in(parent)
        .map_err(|e| AppError::Internal(format!("Failed to create temporary file: {e}")))?;

    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| AppError::Internal(format!("Failed to encode record: {e}")))?;

    temp_file
        .write_all(&bytes)
        .and_then(|_| temp_file.flush())
        .map_err(|e| AppError::Internal(format!("Failed to write record: {e}")))?;

    temp_file
        .persist(path)
        .map_err(|e| AppError::Internal(format!("Failed to persist {}: {}", path.display(), e.error)))?;

    Ok(())
}
