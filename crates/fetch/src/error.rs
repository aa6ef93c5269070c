//! Fetch Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A fetch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Every variant carries the URL that was being fetched, so the error tree
/// says *what* failed without callers having to add context.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Server answered with anything other than `200 OK`.
    #[display("HTTP {status} when fetching {url}")]
    Status {
        #[error(not(source))]
        url: String,
        #[error(not(source))]
        status: u16,
    },
    /// Request did not complete within its timeout.
    #[display("timed out fetching {_0}")]
    Timeout(#[error(not(source))] String),
    /// Could not connect, or the connection dropped mid-transfer.
    #[display("connection failed for {_0}")]
    Connection(#[error(not(source))] String),
    /// Body was received but isn't the JSON document we expected.
    #[display("could not decode response from {_0}")]
    Decode(#[error(not(source))] String),
    /// The HTTP client itself could not be constructed.
    #[display("could not build HTTP client")]
    Client,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Timeout(_) | Self::Connection(_) => true,
            Self::Decode(_) | Self::Client => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(404, false)]
    #[case(403, false)]
    #[case(429, true)]
    #[case(500, true)]
    #[case(503, true)]
    fn test_status_retryable(#[case] status: u16, #[case] expected: bool) {
        let kind = ErrorKind::Status {
            url: "https://example.invalid/manifest.json".to_string(),
            status,
        };
        assert_eq!(kind.is_retryable(), expected);
    }

    #[test]
    fn test_display() {
        let kind = ErrorKind::Status {
            url: "https://example.invalid/manifest.json".to_string(),
            status: 404,
        };
        assert_eq!(kind.to_string(), "HTTP 404 when fetching https://example.invalid/manifest.json");
    }
}
