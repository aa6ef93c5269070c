use crate::archive::extract_atlases;
use crate::error::{ErrorKind, Result, from_fetch, from_storage};
use crate::models::{AssetIndex, Fingerprint, PopulationMode, VersionManifest, VersionMetadata};
use crate::{ASSET_INDEX_FILE, FINGERPRINT_FILE, JAR_CACHE_DIR};
use exn::{OptionExt, ResultExt};
use sprite_fetch::{Fetcher, resource_url};
use sprite_storage::error::ErrorKind as StorageErrorKind;
use sprite_storage::{BackendHandle, CacheOutcome, IntegrityStore};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Default location of the version manifest.
pub const DEFAULT_MANIFEST_URL: &str = "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";
/// Default base of the content-addressed resource endpoint.
pub const DEFAULT_RESOURCES_URL: &str = "https://resources.download.minecraft.net";

/// Where the remote documents live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub manifest: String,
    pub resources: String,
}
impl Default for Endpoints {
    fn default() -> Self {
        Self {
            manifest: DEFAULT_MANIFEST_URL.to_string(),
            resources: DEFAULT_RESOURCES_URL.to_string(),
        }
    }
}

/// Mirrors upstream atlas definitions and the asset index into a storage
/// backend.
///
/// Every artifact that comes with a digest (the client archive, individual
/// asset objects) goes through the [`IntegrityStore`], so nothing unverified
/// ever appears under its final name.
#[derive(Clone)]
pub struct AtlasCache {
    store: IntegrityStore,
    fetcher: Fetcher,
    endpoints: Endpoints,
}

impl AtlasCache {
    pub fn new(backend: BackendHandle, fetcher: Fetcher, endpoints: Endpoints) -> Self {
        Self {
            store: IntegrityStore::new(backend),
            fetcher,
            endpoints,
        }
    }

    pub fn backend(&self) -> &BackendHandle {
        self.store.backend()
    }

    /// Resolve `version` upstream, populate the atlas files, and persist the
    /// asset index.
    ///
    /// Each step short-circuits on failure; whatever was cached before stays
    /// in place. Returns the freshly fetched asset index.
    #[instrument(skip(self))]
    pub async fn refresh_atlases(&self, version: &str, mode: PopulationMode) -> Result<AssetIndex> {
        let manifest: VersionManifest =
            self.fetcher.fetch_json(&self.endpoints.manifest).await.map_err(from_fetch)?;
        let entry = manifest.find(version).ok_or_raise(|| ErrorKind::VersionNotFound(version.to_string()))?;

        let metadata: VersionMetadata = self.fetcher.fetch_json(&entry.url).await.map_err(from_fetch)?;
        let index_ref =
            metadata.asset_index.as_ref().ok_or_raise(|| ErrorKind::AssetIndexMissing(version.to_string()))?;

        let index: AssetIndex = self.fetcher.fetch_json(&index_ref.url).await.map_err(from_fetch)?;
        if index.objects.is_empty() {
            exn::bail!(ErrorKind::AssetIndexEmpty);
        }
        tracing::debug!(objects = index.objects.len(), "resolved asset index");

        match mode {
            PopulationMode::Automatic => self.populate_from_archive(version, &metadata).await?,
            PopulationMode::Objects => self.populate_from_objects(&index).await?,
            PopulationMode::Manual => {
                tracing::info!(backend = self.backend().name(), "manual population, expecting atlas files under the cache root");
            },
        }

        self.write_asset_index(&index).await?;
        tracing::info!(version, %mode, "atlas cache prepared");
        Ok(index)
    }

    /// Asset index persisted by the last successful refresh, if any.
    ///
    /// A file that no longer parses is reported and treated as absent.
    pub async fn read_stored_asset_index(&self) -> Result<Option<AssetIndex>> {
        let Some(bytes) = self.read_optional(Path::new(ASSET_INDEX_FILE)).await? else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(index) => Ok(Some(index)),
            Err(e) => {
                tracing::warn!(error = %e, "stored asset index is unreadable, ignoring it");
                Ok(None)
            },
        }
    }

    /// Fingerprint of the last extraction, if any.
    pub async fn read_fingerprint(&self) -> Result<Option<Fingerprint>> {
        let Some(bytes) = self.read_optional(Path::new(FINGERPRINT_FILE)).await? else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(fingerprint) => Ok(Some(fingerprint)),
            Err(e) => {
                tracing::warn!(error = %e, "atlas fingerprint is unreadable, cache will be re-extracted");
                Ok(None)
            },
        }
    }

    async fn populate_from_archive(&self, version: &str, metadata: &VersionMetadata) -> Result<()> {
        let Some((url, sha1)) = metadata.client_download() else {
            tracing::warn!(version, "version metadata has no client download, cannot populate atlases automatically");
            return Ok(());
        };

        let jar_path = PathBuf::from(JAR_CACHE_DIR).join(format!("{version}.jar"));
        let fetcher = &self.fetcher;
        let outcome = self
            .store
            .ensure_cached(&jar_path, sha1, move || async move {
                fetcher.fetch_archive(url).await.or_raise(|| StorageErrorKind::Network(url.to_string()))
            })
            .await
            .map_err(from_storage)?;
        match outcome {
            CacheOutcome::Reused => tracing::info!(version, "reusing cached client archive"),
            CacheOutcome::Downloaded => tracing::info!(version, "downloaded client archive"),
        }

        if let Some(fingerprint) = self.read_fingerprint().await?
            && fingerprint.matches(version, sha1)
        {
            tracing::info!(version, "atlas cache already up to date, skipping extraction");
            return Ok(());
        }

        let archive = self.backend().read(&jar_path).await.map_err(from_storage)?;
        let atlases = extract_atlases(archive).await?;
        for (path, data) in &atlases {
            self.backend().write(path, data).await.map_err(from_storage)?;
        }

        let fingerprint = Fingerprint::new(version, sha1);
        let json = serde_json::to_vec_pretty(&fingerprint).or_raise(|| ErrorKind::Storage)?;
        self.backend().write(Path::new(FINGERPRINT_FILE), &json).await.map_err(from_storage)?;
        tracing::info!(extracted = atlases.len(), "extracted atlas files from client archive");
        Ok(())
    }

    async fn populate_from_objects(&self, index: &AssetIndex) -> Result<()> {
        let (mut downloaded, mut reused) = (0_usize, 0_usize);
        for (key, object) in index.atlas_objects() {
            let url = resource_url(&self.endpoints.resources, &object.hash)
                .ok_or_raise(|| ErrorKind::MalformedResponse(format!("asset object {key}")))?;
            let url = url.as_str();
            let fetcher = &self.fetcher;
            let outcome = self
                .store
                .ensure_cached(Path::new(key), &object.hash, move || async move {
                    fetcher.fetch_bytes(url).await.or_raise(|| StorageErrorKind::Network(url.to_string()))
                })
                .await
                .map_err(from_storage)?;
            match outcome {
                CacheOutcome::Reused => reused += 1,
                CacheOutcome::Downloaded => downloaded += 1,
            }
        }
        tracing::info!(downloaded, reused, "populated atlas files from asset objects");
        Ok(())
    }

    async fn write_asset_index(&self, index: &AssetIndex) -> Result<()> {
        let json = serde_json::to_vec_pretty(index).or_raise(|| ErrorKind::Storage)?;
        self.backend().write(Path::new(ASSET_INDEX_FILE), &json).await.map_err(from_storage)
    }

    async fn read_optional(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match self.backend().read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if matches!(&*e, StorageErrorKind::NotFound(_)) => Ok(None),
            Err(e) => Err(from_storage(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::build_archive;
    use sprite_fetch::{MockClient, Timeouts};
    use sprite_storage::backend::{MockBackend, StorageBackend};
    use sprite_storage::sha1_hex;
    use std::sync::Arc;

    const VERSION: &str = "1.21.4";
    const MANIFEST_URL: &str = "https://meta.example/mc/version_manifest.json";
    const VERSION_URL: &str = "https://meta.example/v1/1.21.4.json";
    const INDEX_URL: &str = "https://meta.example/v1/indexes/19.json";
    const JAR_URL: &str = "https://meta.example/v1/client.jar";
    const RESOURCES_URL: &str = "https://resources.example";
    const BLOCKS: &[u8] = br#"{"sources":[{"type":"minecraft:directory","source":"block","prefix":"block/"}]}"#;

    struct Fixture {
        backend: Arc<MockBackend>,
        client: Arc<MockClient>,
        cache: AtlasCache,
    }

    fn version_json(jar_sha1: &str) -> String {
        format!(
            r#"{{"assetIndex":{{"url":"{INDEX_URL}"}},"downloads":{{"client":{{"url":"{JAR_URL}","sha1":"{jar_sha1}"}}}}}}"#
        )
    }

    async fn fixture() -> Fixture {
        let jar = build_archive(&[
            ("assets/minecraft/atlases/blocks.json", BLOCKS),
            ("assets/minecraft/textures/block/stone.png", b"png"),
        ]);
        let client = Arc::new(MockClient::new());
        client.serve(MANIFEST_URL, format!(r#"{{"versions":[{{"id":"{VERSION}","url":"{VERSION_URL}"}}]}}"#)).await;
        client.serve(VERSION_URL, version_json(&sha1_hex(&jar))).await;
        let blocks_hash = sha1_hex(BLOCKS);
        client
            .serve(
                INDEX_URL,
                format!(r#"{{"objects":{{"minecraft/atlases/blocks.json":{{"hash":"{blocks_hash}","size":{}}}}}}}"#, BLOCKS.len()),
            )
            .await;
        client.serve(JAR_URL, jar).await;
        client.serve(resource_url(RESOURCES_URL, &blocks_hash).unwrap(), BLOCKS).await;

        let backend = Arc::new(MockBackend::default());
        let endpoints = Endpoints {
            manifest: MANIFEST_URL.to_string(),
            resources: RESOURCES_URL.to_string(),
        };
        let cache = AtlasCache::new(backend.clone(), Fetcher::new(client.clone(), Timeouts::default()), endpoints);
        Fixture { backend, client, cache }
    }

    #[tokio::test]
    async fn test_automatic_refresh_extracts_atlases() {
        let fx = fixture().await;
        let index = fx.cache.refresh_atlases(VERSION, PopulationMode::Automatic).await.unwrap();
        assert_eq!(index.objects.len(), 1);
        assert_eq!(
            fx.backend.paths().await,
            vec![
                PathBuf::from("asset-index.json"),
                PathBuf::from("atlas-metadata.json"),
                PathBuf::from("jar-cache/1.21.4.jar"),
                PathBuf::from("minecraft/atlases/blocks.json"),
            ]
        );
        assert_eq!(fx.backend.read(Path::new("minecraft/atlases/blocks.json")).await.unwrap(), BLOCKS);
        let fingerprint = fx.cache.read_fingerprint().await.unwrap().unwrap();
        assert_eq!(fingerprint.version, VERSION);
    }

    #[tokio::test]
    async fn test_second_refresh_is_a_no_op() {
        let fx = fixture().await;
        fx.cache.refresh_atlases(VERSION, PopulationMode::Automatic).await.unwrap();
        let writes = fx.backend.write_count();
        let fingerprint = fx.cache.read_fingerprint().await.unwrap();

        fx.cache.refresh_atlases(VERSION, PopulationMode::Automatic).await.unwrap();
        assert_eq!(fx.client.requests(JAR_URL).await, 1);
        // Only the asset index is rewritten.
        assert_eq!(fx.backend.write_count(), writes + 1);
        assert_eq!(fx.cache.read_fingerprint().await.unwrap(), fingerprint);
    }

    #[tokio::test]
    async fn test_corrupted_archive_is_downloaded_again() {
        let fx = fixture().await;
        fx.cache.refresh_atlases(VERSION, PopulationMode::Automatic).await.unwrap();
        fx.backend.tamper("jar-cache/1.21.4.jar", b"garbage".to_vec()).await;

        fx.cache.refresh_atlases(VERSION, PopulationMode::Automatic).await.unwrap();
        assert_eq!(fx.client.requests(JAR_URL).await, 2);
    }

    #[tokio::test]
    async fn test_unreadable_fingerprint_triggers_extraction() {
        let fx = fixture().await;
        fx.cache.refresh_atlases(VERSION, PopulationMode::Automatic).await.unwrap();
        fx.backend.tamper("atlas-metadata.json", b"{not json".to_vec()).await;
        fx.backend.tamper("minecraft/atlases/blocks.json", b"stale".to_vec()).await;

        fx.cache.refresh_atlases(VERSION, PopulationMode::Automatic).await.unwrap();
        assert_eq!(fx.backend.read(Path::new("minecraft/atlases/blocks.json")).await.unwrap(), BLOCKS);
        assert!(fx.cache.read_fingerprint().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_archive_hash_mismatch_discards_download() {
        let fx = fixture().await;
        fx.client.serve(VERSION_URL, version_json("0000000000000000000000000000000000000000")).await;
        let err = fx.cache.refresh_atlases(VERSION, PopulationMode::Automatic).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Integrity(_)));
        assert!(fx.backend.paths().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_version() {
        let fx = fixture().await;
        let err = fx.cache.refresh_atlases("0.0.1", PopulationMode::Automatic).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::VersionNotFound(v) if v == "0.0.1"));
        assert_eq!(fx.client.requests(VERSION_URL).await, 0);
    }

    #[tokio::test]
    async fn test_missing_asset_index() {
        let fx = fixture().await;
        fx.client.serve(VERSION_URL, "{}").await;
        let err = fx.cache.refresh_atlases(VERSION, PopulationMode::Automatic).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::AssetIndexMissing(_)));
    }

    #[tokio::test]
    async fn test_empty_asset_index() {
        let fx = fixture().await;
        fx.client.serve(INDEX_URL, r#"{"objects":{}}"#).await;
        let err = fx.cache.refresh_atlases(VERSION, PopulationMode::Automatic).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::AssetIndexEmpty));
        assert!(fx.backend.paths().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_manifest() {
        let fx = fixture().await;
        fx.client.serve(MANIFEST_URL, r#"{"latest":{}}"#).await;
        let err = fx.cache.refresh_atlases(VERSION, PopulationMode::Automatic).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_network_error() {
        let fx = fixture().await;
        fx.client.respond(INDEX_URL, 503, "unavailable").await;
        let err = fx.cache.refresh_atlases(VERSION, PopulationMode::Automatic).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Network));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_client_download_skips_population() {
        let fx = fixture().await;
        fx.client.serve(VERSION_URL, format!(r#"{{"assetIndex":{{"url":"{INDEX_URL}"}}}}"#)).await;
        fx.cache.refresh_atlases(VERSION, PopulationMode::Automatic).await.unwrap();
        assert_eq!(fx.backend.paths().await, vec![PathBuf::from("asset-index.json")]);
    }

    #[tokio::test]
    async fn test_manual_mode_only_persists_index() {
        let fx = fixture().await;
        let index = fx.cache.refresh_atlases(VERSION, PopulationMode::Manual).await.unwrap();
        assert_eq!(fx.client.requests(JAR_URL).await, 0);
        assert_eq!(fx.backend.paths().await, vec![PathBuf::from("asset-index.json")]);
        assert_eq!(fx.cache.read_stored_asset_index().await.unwrap(), Some(index));
    }

    #[tokio::test]
    async fn test_objects_mode_downloads_by_hash() {
        let fx = fixture().await;
        fx.cache.refresh_atlases(VERSION, PopulationMode::Objects).await.unwrap();
        assert_eq!(fx.client.requests(JAR_URL).await, 0);
        assert_eq!(fx.backend.read(Path::new("minecraft/atlases/blocks.json")).await.unwrap(), BLOCKS);

        fx.cache.refresh_atlases(VERSION, PopulationMode::Objects).await.unwrap();
        let url = resource_url(RESOURCES_URL, &sha1_hex(BLOCKS)).unwrap();
        assert_eq!(fx.client.requests(&url).await, 1);
    }

    #[tokio::test]
    async fn test_read_stored_asset_index() {
        let fx = fixture().await;
        assert_eq!(fx.cache.read_stored_asset_index().await.unwrap(), None);
        fx.backend.tamper(ASSET_INDEX_FILE, b"[1, 2".to_vec()).await;
        assert_eq!(fx.cache.read_stored_asset_index().await.unwrap(), None);
    }
}
