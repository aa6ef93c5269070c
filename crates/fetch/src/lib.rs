mod client;
pub mod error;
mod fetcher;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use crate::client::{HttpClient, HttpResponse, ReqwestClient, USER_AGENT};
pub use crate::fetcher::{ClientHandle, Fetcher, Timeouts, resource_url};
#[cfg(any(test, feature = "mock"))]
pub use crate::mock::MockClient;
