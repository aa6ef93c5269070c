//! Cache Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Storage and fetch failures are raised into these kinds
//! so the underlying error stays attached as a child frame.

use derive_more::{Display, Error};
use sprite_fetch::error::{Error as FetchError, ErrorKind as FetchErrorKind};
use sprite_storage::error::{Error as StorageError, ErrorKind as StorageErrorKind};
use std::path::PathBuf;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// ### Upstream Errors
/// - [`ErrorKind::VersionNotFound`]
/// - [`ErrorKind::AssetIndexMissing`]
/// - [`ErrorKind::AssetIndexEmpty`]
/// - [`ErrorKind::MalformedResponse`]
/// - [`ErrorKind::Network`]
///
/// ### Local Errors
/// - [`ErrorKind::Integrity`]
/// - [`ErrorKind::Extraction`]
/// - [`ErrorKind::Storage`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The version manifest has no entry with this id.
    #[display("version {_0} not found in manifest")]
    VersionNotFound(#[error(not(source))] String),
    /// The version metadata has no asset index reference.
    #[display("version {_0} has no asset index")]
    AssetIndexMissing(#[error(not(source))] String),
    /// The asset index has no objects.
    #[display("asset index contains no objects")]
    AssetIndexEmpty,
    /// A remote document was missing fields we rely on.
    #[display("malformed response from {_0}")]
    MalformedResponse(#[error(not(source))] String),
    /// Non-200 status, timeout or connection failure.
    #[display("network error")]
    Network,
    /// A downloaded artifact did not hash to the expected digest. It has
    /// been discarded.
    #[display("integrity check failed for {}", _0.display())]
    Integrity(#[error(not(source))] PathBuf),
    /// The client archive could not be read.
    #[display("could not extract atlases from archive")]
    Extraction,
    /// A read, write or rename in the cache directory failed.
    #[display("cache storage error")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::Integrity(_))
    }
}

/// Raise a fetch error into the matching cache kind.
///
/// Bodies that don't decode into the expected document become
/// [`MalformedResponse`](ErrorKind::MalformedResponse); everything else is a
/// [`Network`](ErrorKind::Network) failure.
#[track_caller]
pub(crate) fn from_fetch(err: FetchError) -> Error {
    let kind = match &*err {
        FetchErrorKind::Decode(url) => ErrorKind::MalformedResponse(url.clone()),
        _ => ErrorKind::Network,
    };
    err.raise(kind)
}

/// Raise a storage error into the matching cache kind.
#[track_caller]
pub(crate) fn from_storage(err: StorageError) -> Error {
    let kind = match &*err {
        StorageErrorKind::Integrity { path, .. } => ErrorKind::Integrity(path.clone()),
        StorageErrorKind::Network(_) => ErrorKind::Network,
        _ => ErrorKind::Storage,
    };
    err.raise(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_integrity_becomes_integrity() {
        let err = StorageError::from(StorageErrorKind::Integrity {
            path: PathBuf::from("jar-cache/1.21.jar"),
            expected: "abc".to_string(),
            actual: "def".to_string(),
        });
        let err = from_storage(err);
        assert!(matches!(&*err, ErrorKind::Integrity(path) if path == &PathBuf::from("jar-cache/1.21.jar")));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_decode_becomes_malformed() {
        let err = from_fetch(FetchError::from(FetchErrorKind::Decode("https://example.invalid/v.json".to_string())));
        assert!(matches!(&*err, ErrorKind::MalformedResponse(_)));
        let err = from_fetch(FetchError::from(FetchErrorKind::Timeout("https://example.invalid/v.json".to_string())));
        assert!(matches!(&*err, ErrorKind::Network));
    }
}
