//! Catalog Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A catalog error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// A [`MalformedAtlas`](ErrorKind::MalformedAtlas) only ever costs that one
/// atlas; the builder logs it and carries on with the rest.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The atlas definition isn't valid JSON or lacks a `sources` array.
    #[display("malformed atlas {_0}")]
    MalformedAtlas(#[error(not(source))] String),
    /// One entry of `sources` is unusable.
    #[display("invalid atlas source: {_0}")]
    InvalidSource(#[error(not(source))] &'static str),
    /// Listing or reading the cache directory failed.
    #[display("catalog storage error")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage)
    }
}
