pub mod backend;
pub mod error;
mod integrity;
mod models;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::integrity::{CacheOutcome, IntegrityStore, hash_matches, sha1_hex};
pub use crate::models::FileInfo;
pub use crate::path::{to_slash, validate as validate_path};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
