use crate::client::HttpClient;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

pub type ClientHandle = Arc<dyn HttpClient + Send + Sync>;

/// Per-request time budgets.
///
/// Metadata documents are small and get a short budget; the client archive
/// is tens of megabytes and gets a long one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub metadata: Duration,
    pub archive: Duration,
}
impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            metadata: Duration::from_secs(60),
            archive: Duration::from_secs(300),
        }
    }
}

/// Status-checked retrieval of remote documents and binaries.
#[derive(Clone)]
pub struct Fetcher {
    client: ClientHandle,
    timeouts: Timeouts,
}

impl Fetcher {
    pub fn new(client: ClientHandle, timeouts: Timeouts) -> Self {
        Self { client, timeouts }
    }

    /// Fetch and deserialize a JSON document using the metadata timeout.
    #[instrument(skip(self))]
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.fetch(url, self.timeouts.metadata).await?;
        serde_json::from_slice(&body).or_raise(|| ErrorKind::Decode(url.to_string()))
    }

    /// Fetch a small binary resource (a single asset object) using the
    /// metadata timeout.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.fetch(url, self.timeouts.metadata).await
    }

    /// Fetch a large binary (the client archive) using the archive timeout.
    #[instrument(skip(self))]
    pub async fn fetch_archive(&self, url: &str) -> Result<Vec<u8>> {
        let body = self.fetch(url, self.timeouts.archive).await?;
        tracing::info!(bytes = body.len(), "downloaded archive");
        Ok(body)
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        let response = self.client.get(url, timeout).await?;
        if response.status != 200 {
            exn::bail!(ErrorKind::Status {
                url: url.to_string(),
                status: response.status,
            });
        }
        Ok(response.body)
    }
}

/// URL of a content-addressed resource: `<base>/<first two hex chars>/<hash>`.
///
/// Returns `None` if `hash` is too short to have a two-character bucket.
pub fn resource_url(base: &str, hash: &str) -> Option<String> {
    let bucket = hash.get(..2)?;
    Some(format!("{}/{}/{}", base.trim_end_matches('/'), bucket, hash))
}
