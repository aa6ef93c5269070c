use crate::error::{Result, from_cache, from_catalog};
use crate::notify::{Notice, Notifier};
use sprite_cache::error::ErrorKind as CacheErrorKind;
use sprite_cache::{AtlasCache, PopulationMode};
use sprite_catalog::{Catalog, CatalogSnapshot};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tracing::instrument;

/// Result of asking for a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Completed { atlases: usize, sprites: usize },
    /// Another refresh held the guard; nothing was done.
    AlreadyRunning,
}

/// Ties the cache, the catalog and the refresh guard together.
///
/// At most one refresh runs at a time. Requests arriving while one is in
/// flight are dropped rather than queued.
pub struct AtlasService {
    cache: AtlasCache,
    catalog: Catalog,
    version: String,
    mode: PopulationMode,
    in_progress: Arc<AtomicBool>,
}

impl AtlasService {
    pub fn new(cache: AtlasCache, version: impl Into<String>, mode: PopulationMode) -> Self {
        let catalog = Catalog::new(Arc::clone(cache.backend()));
        Self {
            cache,
            catalog,
            version: version.into(),
            mode,
            in_progress: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Refresh the cache and publish a new catalog, unless a refresh is
    /// already running.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let Some(_guard) = InFlight::acquire(&self.in_progress) else {
            tracing::info!("refresh already in progress");
            return Ok(RefreshOutcome::AlreadyRunning);
        };
        let snapshot = self.run().await?;
        Ok(RefreshOutcome::Completed {
            atlases: snapshot.atlases().len(),
            sprites: snapshot.total_sprites(),
        })
    }

    /// Run a refresh on the tokio runtime, reporting progress to `notifier`.
    ///
    /// Returns `None`, after sending [`Notice::AlreadyRunning`], when a
    /// refresh is already in flight.
    pub fn spawn_refresh(self: &Arc<Self>, notifier: Arc<dyn Notifier>) -> Option<JoinHandle<()>> {
        let Some(guard) = InFlight::acquire(&self.in_progress) else {
            notifier.notify(Notice::AlreadyRunning);
            return None;
        };
        notifier.notify(Notice::Started);
        let service = Arc::clone(self);
        Some(tokio::spawn(async move {
            let _guard = guard;
            match service.run().await {
                Ok(snapshot) => notifier.notify(Notice::Completed {
                    atlases: snapshot.atlases().len(),
                    sprites: snapshot.total_sprites(),
                }),
                Err(e) => notifier.notify(Notice::Failed((*e).to_string())),
            }
        }))
    }

    /// Rebuild the catalog from whatever an earlier run left on disk,
    /// without touching the network.
    ///
    /// Returns `None` if there is no stored asset index yet, or if a refresh
    /// is in flight: that refresh publishes a newer catalog than the one on
    /// disk, so the bootstrap stands aside. It holds the refresh guard while
    /// it runs, so a refresh requested meanwhile is dropped.
    #[instrument(skip(self))]
    pub async fn bootstrap_from_cache(&self) -> Result<Option<Arc<CatalogSnapshot>>> {
        let Some(_guard) = InFlight::acquire(&self.in_progress) else {
            tracing::info!("refresh in progress, skipping bootstrap");
            return Ok(None);
        };
        let Some(index) = self.cache.read_stored_asset_index().await.map_err(from_cache)? else {
            tracing::info!("no stored asset index, catalog stays empty until the first refresh");
            return Ok(None);
        };
        let snapshot = self.catalog.rebuild(&index).await.map_err(from_catalog)?;
        Ok(Some(snapshot))
    }

    #[instrument(skip(self), fields(version = %self.version, mode = %self.mode))]
    async fn run(&self) -> Result<Arc<CatalogSnapshot>> {
        let index = match self.cache.refresh_atlases(&self.version, self.mode).await {
            Ok(index) => index,
            Err(e) => {
                if is_upstream_fault(&e) {
                    tracing::warn!(error = ?e, "refresh failed");
                } else {
                    tracing::error!(error = ?e, "refresh failed");
                }
                return Err(from_cache(e));
            },
        };
        let snapshot = match self.catalog.rebuild(&index).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = ?e, "catalog rebuild failed");
                return Err(from_catalog(e));
            },
        };
        tracing::info!(
            atlases = snapshot.atlases().len(),
            sprites = snapshot.total_sprites(),
            "refresh complete"
        );
        Ok(snapshot)
    }
}

/// Upstream served something unusable; retrying later won't help until it
/// changes. Everything else points at this machine or the network.
fn is_upstream_fault(kind: &CacheErrorKind) -> bool {
    matches!(
        kind,
        CacheErrorKind::VersionNotFound(_)
            | CacheErrorKind::AssetIndexMissing(_)
            | CacheErrorKind::AssetIndexEmpty
            | CacheErrorKind::MalformedResponse(_)
    )
}

/// Holds the refresh flag; clears it when dropped, whichever way the
/// refresh ends.
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
