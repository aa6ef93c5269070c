//! Canned-response HTTP client for testing.

use crate::client::{HttpClient, HttpResponse};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

/// In-memory [`HttpClient`] serving canned responses.
///
/// URLs without a registered response fail with
/// [`Connection`](ErrorKind::Connection), as if the host were unreachable.
/// Every request is counted per URL so tests can assert what was (or wasn't)
/// downloaded.
#[derive(Default)]
pub struct MockClient {
    responses: RwLock<HashMap<String, HttpResponse>>,
    requests: RwLock<HashMap<String, usize>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with `200 OK` for `url`.
    pub async fn serve(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.respond(url, 200, body).await;
    }

    /// Serve `body` with an arbitrary status code for `url`.
    pub async fn respond(&self, url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) {
        let response = HttpResponse {
            status,
            body: body.into(),
        };
        self.responses.write().await.insert(url.into(), response);
    }

    /// Number of requests made for `url` so far.
    pub async fn requests(&self, url: &str) -> usize {
        self.requests.read().await.get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse> {
        *self.requests.write().await.entry(url.to_string()).or_default() += 1;
        match self.responses.read().await.get(url) {
            Some(response) => Ok(response.clone()),
            None => exn::bail!(ErrorKind::Connection(url.to_string())),
        }
    }
}
