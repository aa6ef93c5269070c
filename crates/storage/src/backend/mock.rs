//! In-memory storage backend for testing.

use super::FileInfoStream;
use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::models::FileInfo;
use crate::path::validate as validate_path;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Cache directory held in memory.
///
/// Files live in a sorted map behind a [`RwLock`], so listings come back in
/// path order. Successful writes are counted, which lets tests assert that a
/// refresh did (or didn't) touch the cache.
pub struct MockBackend {
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
    writes: AtomicUsize,
}

/// Validate a path handed to a test helper; a bad one is a broken test.
fn checked(path: &Path, helper: &str) -> PathBuf {
    match validate_path(path) {
        Ok(path) => path,
        Err(_) => panic!("MockBackend::{helper}: invalid path {}", path.display()),
    }
}

impl MockBackend {
    /// Mock backend pre-populated with `(path, contents)` pairs.
    ///
    /// Panics on an invalid path (e.g. one escaping the root).
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let files: BTreeMap<PathBuf, Vec<u8>> = files
            .into_iter()
            .map(|(path, data)| {
                let path: PathBuf = path.into();
                (checked(&path, "with_files"), data.into())
            })
            .collect();
        Self {
            files: RwLock::new(files),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of successful [`write`](StorageBackend::write) calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Overwrite a file without counting it as a write, e.g. to corrupt a
    /// cached file behind the cache's back.
    pub async fn tamper(&self, path: impl AsRef<Path>, data: impl Into<Vec<u8>>) {
        let path = checked(path.as_ref(), "tamper");
        self.files.write().await.insert(path, data.into());
    }

    /// Every stored path, in order.
    pub async fn paths(&self) -> Vec<PathBuf> {
        self.files.read().await.keys().cloned().collect()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::with_files(Vec::<(PathBuf, Vec<u8>)>::new())
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let prefix = match prefix.map(validate_path).transpose() {
            Ok(prefix) => prefix,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };
        Box::pin(stream! {
            // Copy the listing out so the lock isn't held across yields.
            let listing: Vec<FileInfo> = self
                .files
                .read()
                .await
                .iter()
                .filter(|(path, _)| prefix.as_ref().is_none_or(|prefix| path.starts_with(prefix)))
                .map(|(path, data)| FileInfo::new(path.clone(), data.len() as u64))
                .collect();
            for file in listing {
                yield Ok(file);
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.files.read().await.contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        match self.files.read().await.get(&path) {
            Some(data) => Ok(data.clone()),
            None => exn::bail!(ErrorKind::NotFound(path)),
        }
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        self.files.write().await.insert(path, data.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        if self.files.write().await.remove(&path).is_none() {
            exn::bail!(ErrorKind::NotFound(path));
        }
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let (from, to) = (validate_path(from)?, validate_path(to)?);
        let mut files = self.files.write().await;
        let Some(data) = files.remove(&from) else {
            exn::bail!(ErrorKind::NotFound(from));
        };
        files.insert(to, data);
        Ok(())
    }
}
