//! Service Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Mirroring the upstream atlases failed; the published catalog is
    /// unchanged.
    #[display("atlas refresh failed: {_0}")]
    Refresh(#[error(not(source))] String),
    /// The cache was refreshed but the catalog could not be rebuilt from it.
    #[display("catalog rebuild failed: {_0}")]
    Catalog(#[error(not(source))] String),
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        true
    }
}

#[track_caller]
pub(crate) fn from_cache(err: sprite_cache::error::Error) -> Error {
    let reason = (*err).to_string();
    err.raise(ErrorKind::Refresh(reason))
}

#[track_caller]
pub(crate) fn from_catalog(err: sprite_catalog::error::Error) -> Error {
    let reason = (*err).to_string();
    err.raise(ErrorKind::Catalog(reason))
}
