//! Local mirror of upstream atlas definitions.
//!
//! The cache directory is laid out as:
//! - `asset-index.json`: the last successfully fetched asset index
//! - `atlas-metadata.json`: [`Fingerprint`] of the archive the atlases came from
//! - `jar-cache/<version>.jar`: the verified client archive
//! - `<namespace>/atlases/<name>.json`: atlas definitions
//!
//! [`AtlasCache`] populates it; the catalog crate reads it back.

mod archive;
pub mod error;
mod models;
mod refresh;

pub use crate::models::{
    AssetIndex, AssetObject, Fingerprint, PopulationMode, UnknownPopulationMode, VersionManifest, VersionMetadata,
};
pub use crate::refresh::{AtlasCache, DEFAULT_MANIFEST_URL, DEFAULT_RESOURCES_URL, Endpoints};

pub const ASSET_INDEX_FILE: &str = "asset-index.json";
pub const FINGERPRINT_FILE: &str = "atlas-metadata.json";
pub const JAR_CACHE_DIR: &str = "jar-cache";
/// Path segment every atlas definition lives under.
pub const ATLAS_SEGMENT: &str = "/atlases/";
pub const ATLAS_SUFFIX: &str = ".json";

/// Whether a `/`-separated path names an atlas definition.
pub fn is_atlas_path(path: &str) -> bool {
    path.contains(ATLAS_SEGMENT) && path.ends_with(ATLAS_SUFFIX)
}
