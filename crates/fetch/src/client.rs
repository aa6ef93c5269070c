//! HTTP client capability.
//!
//! The refresh pipeline only ever issues plain `GET`s and looks at the status
//! code and body, so that's all [`HttpClient`] exposes. [`ReqwestClient`] is
//! the real implementation; tests swap in
//! [`MockClient`](crate::MockClient).

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use std::time::Duration;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("sprite-atlas/", env!("CARGO_PKG_VERSION"));

/// Status code and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Minimal `GET` capability.
///
/// Implementations report transport failures (timeouts, refused connections)
/// as errors, but hand back non-`200` responses as-is; status validation is
/// the caller's job.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse>;
}

/// [`HttpClient`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(connect_timeout: Duration) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(connect_timeout)
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse> {
        let response = self.inner.get(url).timeout(timeout).send().await.map_err(|e| map_reqwest_error(url, e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| map_reqwest_error(url, e))?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn map_reqwest_error(url: &str, err: reqwest::Error) -> exn::Exn<ErrorKind> {
    let kind = if err.is_timeout() {
        ErrorKind::Timeout(url.to_string())
    } else {
        ErrorKind::Connection(url.to_string())
    };
    tracing::debug!(url, error = %err, "request failed");
    exn::Exn::from(kind)
}
