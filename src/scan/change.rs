//! Content-hash change detection

use crate::chunk::compute_content_hash;
use crate::error::Result;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Current on-disk state of a candidate file
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    pub hash: String,
    pub mtime: i64,
    pub size_bytes: i64,
    pub content: String,
}

/// Outcome of comparing a file against its persisted hash
#[derive(Debug, Clone)]
pub enum FileChange {
    /// No prior record for this path
    New(FileSnapshot),
    /// Hash differs from the stored one
    Modified(FileSnapshot),
    /// Hash matches; indexing is a no-op
    Unchanged,
    /// Path no longer resolves to a regular file
    Deleted,
}

/// Classify a file against its previously stored content hash.
///
/// Read errors (permissions, races) propagate as errors so the caller can
/// record a failure; they are never treated as deletion.
pub fn classify(path: &Path, stored_hash: Option<&str>) -> Result<FileChange> {
    if !path.is_file() {
        return Ok(FileChange::Deleted);
    }

    let bytes = std::fs::read(path)?;
    let hash = compute_content_hash(&bytes);

    match stored_hash {
        Some(stored) if stored == hash => Ok(FileChange::Unchanged),
        existing => {
            let metadata = std::fs::metadata(path)?;
            let mtime = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);

            let snapshot = FileSnapshot {
                hash,
                mtime,
                size_bytes: metadata.len() as i64,
                content: String::from_utf8_lossy(&bytes).into_owned(),
            };

            if existing.is_some() {
                Ok(FileChange::Modified(snapshot))
            } else {
                Ok(FileChange::New(snapshot))
            }
        }
    }
}
