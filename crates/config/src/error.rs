//! Configuration Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A configuration file was named explicitly but doesn't exist.
    #[display("configuration file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The merged configuration doesn't fit the expected shape.
    #[display("invalid configuration")]
    Invalid,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        false
    }
}
