//! Storage backend trait and implementations.
//!
//! The cache pipeline and the catalog builder never touch `std::fs` or
//! `tokio::fs` directly: everything goes through [`StorageBackend`], so the
//! whole refresh can run against the in-memory [`MockBackend`] in tests.

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
use crate::error::Result;
use crate::models::FileInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;

pub type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// Unified interface for the cache directory.
///
/// A glorified key→bytes store keyed by relative path. All paths are relative
/// to the storage root and are validated with
/// [`validate_path`](crate::validate_path) by every implementation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use sprite_storage::{backend::StorageBackend, error::Result};
///
/// async fn cached_atlas_size(backend: &dyn StorageBackend) -> Result<u64> {
///     let path = Path::new("minecraft/atlases/blocks.json");
///     if backend.exists(path).await? {
///         Ok(backend.read(path).await?.len() as u64)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend (used for logging only).
    fn name(&self) -> &str;

    /// List all files matching an optional prefix.
    ///
    /// Default implementation of this method is to collect all the results
    /// from [`list_stream()`](Self::list_stream) into a [`Vec`] before
    /// returning.
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Stream file metadata matching an optional prefix.
    ///
    /// Walks the whole tree below the root (or below the prefix), yielding
    /// regular files only. Order is unspecified; callers that need a stable
    /// order sort the result. Asking for a prefix that doesn't exist yields
    /// an empty stream, not an error.
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a>;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write file contents, creating or overwriting.
    ///
    /// Implementations create parent directories as needed, so repeated
    /// writes into the same directory are idempotent.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Delete a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Rename/move a file within the same backend.
    ///
    /// # Notes
    /// - Implementations should create parent directories as needed
    /// - If the destination already exists, it will be overwritten
    /// - Readers of `to` observe either the old or the new contents, never a
    ///   partially written file
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;
}
