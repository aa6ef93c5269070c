//! Catalog construction from the cache directory, and the published handle.

use crate::consts::{DEFAULT_NAMESPACE, TEXTURES_INDEX_FILE};
use crate::error::{ErrorKind, Result};
use crate::parse::parse_atlas;
use crate::snapshot::{AtlasEntry, CatalogSnapshot};
use crate::textures::{TextureIndex, parse_textures_index};
use arc_swap::ArcSwapOption;
use exn::ResultExt;
use sprite_cache::{AssetIndex, is_atlas_path};
use sprite_storage::BackendHandle;
use sprite_storage::error::ErrorKind as StorageErrorKind;
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

/// Turns the cached atlas definitions into a [`CatalogSnapshot`].
#[derive(Clone)]
pub struct CatalogBuilder {
    backend: BackendHandle,
}

impl CatalogBuilder {
    pub fn new(backend: BackendHandle) -> Self {
        Self { backend }
    }

    /// Parse every cached atlas into a fresh snapshot.
    ///
    /// An atlas that fails to parse, or disappears between listing and
    /// reading, is logged and left out; only failing to list the cache
    /// directory at all is an error.
    #[instrument(skip_all, fields(backend = self.backend.name()))]
    pub async fn build(&self, asset_index: &AssetIndex) -> Result<CatalogSnapshot> {
        let textures = self.texture_index(asset_index).await;
        let mut atlases = Vec::new();
        for path in self.atlas_paths().await? {
            if let Some(atlas) = self.load_atlas(&path, &textures).await {
                atlases.push(atlas);
            }
        }
        Ok(CatalogSnapshot::new(atlases))
    }

    async fn texture_index(&self, asset_index: &AssetIndex) -> TextureIndex {
        match self.read_textures_override().await {
            Some(paths) => {
                tracing::debug!(textures = paths.len(), "using {TEXTURES_INDEX_FILE}");
                TextureIndex::from_paths(paths)
            },
            None => TextureIndex::from_paths(asset_index.objects.keys()),
        }
    }

    async fn read_textures_override(&self) -> Option<Vec<String>> {
        let path = Path::new(TEXTURES_INDEX_FILE);
        let bytes = match self.backend.read(path).await {
            Ok(bytes) => bytes,
            Err(e) if matches!(&*e, StorageErrorKind::NotFound(_)) => return None,
            Err(e) => {
                tracing::warn!(error = ?e, "could not read {TEXTURES_INDEX_FILE}, using the asset index");
                return None;
            },
        };
        let paths = parse_textures_index(&String::from_utf8_lossy(&bytes));
        if paths.is_empty() {
            tracing::warn!("{TEXTURES_INDEX_FILE} is empty, using the asset index");
            return None;
        }
        Some(paths)
    }

    /// Relative `/`-separated paths of every cached atlas definition, sorted.
    async fn atlas_paths(&self) -> Result<Vec<String>> {
        let files = self.backend.list(None).await.or_raise(|| ErrorKind::Storage)?;
        let mut paths: Vec<String> = files
            .into_iter()
            .filter_map(|file| sprite_storage::to_slash(&file.path))
            .filter(|path| is_atlas_path(path))
            .collect();
        paths.sort();
        Ok(paths)
    }

    async fn load_atlas(&self, path: &str, textures: &TextureIndex) -> Option<AtlasEntry> {
        let (namespace, file_name) = split_atlas_path(path);
        let bytes = match self.backend.read(Path::new(path)).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path, error = ?e, "atlas vanished before it could be read");
                return None;
            },
        };
        match parse_atlas(namespace, file_name, &bytes, textures.namespace(namespace)) {
            Ok(atlas) => Some(atlas),
            Err(e) => {
                tracing::warn!(path, error = ?e, "skipping atlas");
                None
            },
        }
    }
}

/// `minecraft/atlases/blocks.json` → (`minecraft`, `blocks.json`).
fn split_atlas_path(path: &str) -> (&str, &str) {
    let namespace = match path.split_once('/') {
        Some((namespace, _)) if !namespace.is_empty() => namespace,
        _ => DEFAULT_NAMESPACE,
    };
    let file_name = path.rsplit_once('/').map_or(path, |(_, name)| name);
    (namespace, file_name)
}

/// The live catalog: the last published snapshot plus the means to rebuild it.
///
/// Readers grab an `Arc` to the current snapshot and keep using it for as
/// long as they like; a rebuild publishes a new one with a single pointer
/// swap, so a reader sees either the old catalog or the new one.
pub struct Catalog {
    snapshot: ArcSwapOption<CatalogSnapshot>,
    builder: CatalogBuilder,
}

impl Catalog {
    pub fn new(backend: BackendHandle) -> Self {
        Self {
            snapshot: ArcSwapOption::empty(),
            builder: CatalogBuilder::new(backend),
        }
    }

    /// The published snapshot, or `None` while the catalog holds no atlases
    /// (never rebuilt, or rebuilt from a cache with nothing in it).
    pub fn current_snapshot(&self) -> Option<Arc<CatalogSnapshot>> {
        self.snapshot.load_full().filter(|snapshot| !snapshot.is_empty())
    }

    pub fn snapshot_or_empty(&self) -> Arc<CatalogSnapshot> {
        self.snapshot.load_full().unwrap_or_default()
    }

    /// Build a new snapshot and publish it.
    ///
    /// On error the previously published snapshot stays in place.
    pub async fn rebuild(&self, asset_index: &AssetIndex) -> Result<Arc<CatalogSnapshot>> {
        let snapshot = Arc::new(self.builder.build(asset_index).await?);
        tracing::info!(
            atlases = snapshot.atlases().len(),
            sprites = snapshot.total_sprites(),
            "catalog rebuilt"
        );
        self.publish(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    pub fn publish(&self, snapshot: Arc<CatalogSnapshot>) {
        self.snapshot.store(Some(snapshot));
    }
}
