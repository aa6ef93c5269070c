//! Hash-verified cache entries.
//!
//! [`IntegrityStore`] wraps a backend and only ever exposes files under their
//! final name once their SHA-1 has been checked against the digest the
//! upstream index promised for them.

use crate::BackendHandle;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sha1::{Digest, Sha1};
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Suffix appended to the final path while a download is being verified.
const TEMP_SUFFIX: &str = ".part";

/// What [`IntegrityStore::ensure_cached`] had to do to satisfy the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// The file was already present with the expected hash; nothing was
    /// fetched.
    Reused,
    /// The file was missing or stale and has been fetched, verified and moved
    /// into place.
    Downloaded,
}

/// Lowercase hex SHA-1 of `bytes`.
pub fn sha1_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha1::digest(bytes))
}

/// Case-insensitive comparison of two hex digests.
pub fn hash_matches(actual: &str, expected: &str) -> bool {
    actual.eq_ignore_ascii_case(expected.trim())
}

/// Key→bytes store that refuses to keep content whose hash doesn't match.
#[derive(Clone)]
pub struct IntegrityStore {
    backend: BackendHandle,
}

impl IntegrityStore {
    pub fn new(backend: BackendHandle) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &BackendHandle {
        &self.backend
    }

    /// Make sure `path` holds bytes whose SHA-1 is `expected`.
    ///
    /// If the file already exists and hashes correctly, `fetch` is never
    /// called. Otherwise the fetched bytes are written to `<path>.part`,
    /// verified, and renamed over `path`. A mismatch removes both the
    /// temporary file and whatever stale file sat under `path`, then fails
    /// with [`ErrorKind::Integrity`].
    ///
    /// Errors returned by `fetch` are passed through untouched; callers
    /// usually raise them as [`ErrorKind::Network`].
    #[instrument(skip(self, fetch), fields(path = %path.display()))]
    pub async fn ensure_cached<F, Fut>(&self, path: &Path, expected: &str, fetch: F) -> Result<CacheOutcome>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Vec<u8>>> + Send,
    {
        if self.is_valid(path, expected).await? {
            tracing::debug!("cached file matches expected hash");
            return Ok(CacheOutcome::Reused);
        }

        let bytes = fetch().await?;
        let temp = temp_path(path);
        self.backend.write(&temp, &bytes).await?;

        // Hash what actually landed on disk, not what we meant to write.
        let written = self.backend.read(&temp).await?;
        let size = written.len();
        let actual = digest(written).await?;
        if !hash_matches(&actual, expected) {
            tracing::error!(%expected, %actual, "downloaded file failed integrity check");
            self.discard(&temp).await;
            self.discard(path).await;
            exn::bail!(ErrorKind::Integrity {
                path: path.to_path_buf(),
                expected: expected.to_string(),
                actual,
            });
        }

        self.backend.rename(&temp, path).await?;
        tracing::debug!(bytes = size, "cached file verified and stored");
        Ok(CacheOutcome::Downloaded)
    }

    /// Whether `path` exists and its content hashes to `expected`.
    pub async fn is_valid(&self, path: &Path, expected: &str) -> Result<bool> {
        if !self.backend.exists(path).await? {
            return Ok(false);
        }
        let bytes = match self.backend.read(path).await {
            Ok(bytes) => bytes,
            Err(e) if matches!(&*e, ErrorKind::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        let actual = digest(bytes).await?;
        if hash_matches(&actual, expected) {
            Ok(true)
        } else {
            tracing::warn!(path = %path.display(), %expected, %actual, "cached file is corrupt, re-fetching");
            Ok(false)
        }
    }

    async fn discard(&self, path: &Path) {
        match self.backend.delete(path).await {
            Ok(()) => {},
            Err(e) if matches!(&*e, ErrorKind::NotFound(_)) => {},
            Err(e) => tracing::warn!(path = %path.display(), error = ?e, "could not remove rejected file"),
        }
    }
}

/// [`sha1_hex`] on the blocking pool; client archives run to tens of MB.
async fn digest(bytes: Vec<u8>) -> Result<String> {
    tokio::task::spawn_blocking(move || sha1_hex(&bytes))
        .await
        .or_raise(|| ErrorKind::BackendError("hashing task failed".to_string()))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut temp = path.as_os_str().to_owned();
    temp.push(TEMP_SUFFIX);
    PathBuf::from(temp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const HELLO_SHA1: &str = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";

    fn store() -> (TempDir, IntegrityStore) {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("test", temp_dir.path()).unwrap();
        (temp_dir, IntegrityStore::new(Arc::new(backend)))
    }

    async fn files(store: &IntegrityStore) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = store.backend().list(None).await.unwrap().into_iter().map(|f| f.path).collect();
        paths.sort();
        paths
    }

    #[test]
    fn test_sha1_hex() {
        assert_eq!(sha1_hex(b"hello"), HELLO_SHA1);
        assert!(hash_matches(HELLO_SHA1, &HELLO_SHA1.to_uppercase()));
        assert!(!hash_matches(HELLO_SHA1, "0000"));
    }

    #[tokio::test]
    async fn test_digest_off_the_async_worker() {
        assert_eq!(digest(b"hello".to_vec()).await.unwrap(), HELLO_SHA1);
        let large = vec![0u8; 8 * 1024 * 1024];
        assert_eq!(digest(large.clone()).await.unwrap(), sha1_hex(&large));
    }

    #[test]
    fn test_temp_path() {
        assert_eq!(temp_path(Path::new("jar-cache/1.21.jar")), Path::new("jar-cache/1.21.jar.part"));
    }

    #[tokio::test]
    async fn test_downloads_when_missing() {
        let (_temp_dir, store) = store();
        let path = Path::new("jar-cache/1.21.jar");
        let outcome = store.ensure_cached(path, HELLO_SHA1, || async { Ok(b"hello".to_vec()) }).await.unwrap();
        assert_eq!(outcome, CacheOutcome::Downloaded);
        assert_eq!(store.backend().read(path).await.unwrap(), b"hello");
        assert_eq!(files(&store).await, vec![PathBuf::from("jar-cache/1.21.jar")]);
    }

    #[tokio::test]
    async fn test_reuses_valid_file_without_fetching() {
        let (_temp_dir, store) = store();
        let path = Path::new("jar-cache/1.21.jar");
        store.backend().write(path, b"hello").await.unwrap();
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let outcome = store
            .ensure_cached(path, &HELLO_SHA1.to_uppercase(), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(b"hello".to_vec())
            })
            .await
            .unwrap();
        assert_eq!(outcome, CacheOutcome::Reused);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refetches_corrupted_file() {
        let (temp_dir, store) = store();
        let path = Path::new("jar-cache/1.21.jar");
        store.backend().write(path, b"hello").await.unwrap();
        std::fs::write(temp_dir.path().join(path), b"corrupted").unwrap();
        let outcome = store.ensure_cached(path, HELLO_SHA1, || async { Ok(b"hello".to_vec()) }).await.unwrap();
        assert_eq!(outcome, CacheOutcome::Downloaded);
        assert_eq!(store.backend().read(path).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_mismatch_leaves_nothing_behind() {
        let (_temp_dir, store) = store();
        let path = Path::new("jar-cache/1.21.jar");
        store.backend().write(path, b"stale").await.unwrap();
        let err = store.ensure_cached(path, HELLO_SHA1, || async { Ok(b"not hello".to_vec()) }).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Integrity { .. }));
        assert!(files(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_error_passes_through() {
        let (_temp_dir, store) = store();
        let err = store
            .ensure_cached(Path::new("a.json"), HELLO_SHA1, || async {
                Err(exn::Exn::from(ErrorKind::Network("https://example.invalid/a.json".to_string())))
            })
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::Network(_)));
        assert!(files(&store).await.is_empty());
    }
}
