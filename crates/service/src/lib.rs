//! Atlas service: the entry point consumers use to refresh the cache and
//! read the catalog.
//!
//! A typical host calls [`AtlasService::bootstrap_from_cache`] at start-up so
//! lookups work offline, then [`AtlasService::spawn_refresh`] whenever the
//! user asks for fresh data.

pub mod error;
mod notify;
mod service;

pub use crate::notify::{Notice, Notifier};
pub use crate::service::{AtlasService, RefreshOutcome};
