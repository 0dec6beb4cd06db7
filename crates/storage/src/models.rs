//! Storage models.

use std::path::PathBuf;
use time::OffsetDateTime;

/// Artifact metadata returned by stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Artifact key, relative to the store root
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: impl Into<OffsetDateTime>) -> Self {
        Self {
            path: path.into(),
            size,
            modified: modified.into(),
        }
    }
}
