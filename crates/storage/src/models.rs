//! Storage models.

use std::path::PathBuf;

/// File metadata returned by storage backends.
///
/// Produced by listing operations; the catalog builder walks these to
/// discover cached atlas definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Relative path from storage root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64) -> Self {
        Self { path: path.into(), size }
    }
}
