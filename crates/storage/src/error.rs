//! Storage Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// File does not exist
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Access denied (permissions)
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Fetching the bytes for a cache entry failed (connection, HTTP status,
    /// timeout). The resource name is whatever the fetcher was asked for.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// Path contains invalid characters or escapes root
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
    /// Content hash of freshly fetched bytes did not match the expected hash.
    /// Nothing was left behind under the final path.
    #[display("integrity check failed for {}: expected {expected}, got {actual}", path.display())]
    Integrity {
        #[error(not(source))]
        path: PathBuf,
        #[error(not(source))]
        expected: String,
        #[error(not(source))]
        actual: String,
    },
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A corrupt download might just be a truncated transfer.
        matches!(self, Self::Io(_) | Self::Network(_) | Self::BackendError(_) | Self::Integrity { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_display() {
        let kind = ErrorKind::Integrity {
            path: PathBuf::from("jar-cache/1.21.jar"),
            expected: "abc".to_string(),
            actual: "def".to_string(),
        };
        assert_eq!(kind.to_string(), "integrity check failed for jar-cache/1.21.jar: expected abc, got def");
    }

    #[test]
    fn retryable() {
        assert!(ErrorKind::Network("https://example.com".to_string()).is_retryable());
        assert!(!ErrorKind::NotFound(PathBuf::from("missing.json")).is_retryable());
        assert!(!ErrorKind::InvalidPath(PathBuf::from("../escape")).is_retryable());
    }
}
