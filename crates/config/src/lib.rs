//! Layered configuration.
//!
//! Sources, lowest priority first:
//! 1. built-in defaults
//! 2. `config.{toml,yaml,json}` in the platform config directory
//! 3. a file passed explicitly (format picked by extension, TOML otherwise)
//! 4. `SPRITE_`-prefixed environment variables, `__` separating nested keys
//!    (`SPRITE_TIMEOUTS__ARCHIVE=600`)

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Deserializer, Serialize};
use sprite_cache::{DEFAULT_MANIFEST_URL, DEFAULT_RESOURCES_URL, Endpoints, PopulationMode};
use sprite_fetch::Timeouts;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "SPRITE_";
const CACHE_DIR_NAME: &str = "atlas-cache";
const CONFIG_STEM: &str = "config";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Root of the atlas cache.
    pub cache_dir: PathBuf,
    /// Game version to mirror; the CLI can override it per refresh.
    pub version: Option<String>,
    #[serde(deserialize_with = "lenient_population")]
    pub population: PopulationMode,
    pub endpoints: EndpointsConfig,
    pub timeouts: TimeoutsConfig,
    /// Rows per page in listings.
    pub page_size: NonZeroUsize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub manifest: String,
    pub resources: String,
}

/// Timeouts in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub connect: u64,
    pub metadata: u64,
    pub archive: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: project_dirs()
                .map(|dirs| dirs.cache_dir().join(CACHE_DIR_NAME))
                .unwrap_or_else(|| PathBuf::from(CACHE_DIR_NAME)),
            version: None,
            population: PopulationMode::default(),
            endpoints: EndpointsConfig::default(),
            timeouts: TimeoutsConfig::default(),
            page_size: NonZeroUsize::new(8).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            manifest: DEFAULT_MANIFEST_URL.to_string(),
            resources: DEFAULT_RESOURCES_URL.to_string(),
        }
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        let defaults = Timeouts::default();
        Self {
            connect: defaults.connect.as_secs(),
            metadata: defaults.metadata.as_secs(),
            archive: defaults.archive.as_secs(),
        }
    }
}

impl From<&EndpointsConfig> for Endpoints {
    fn from(config: &EndpointsConfig) -> Self {
        Self {
            manifest: config.manifest.clone(),
            resources: config.resources.clone(),
        }
    }
}

impl From<TimeoutsConfig> for Timeouts {
    fn from(config: TimeoutsConfig) -> Self {
        Self {
            connect: Duration::from_secs(config.connect),
            metadata: Duration::from_secs(config.metadata),
            archive: Duration::from_secs(config.archive),
        }
    }
}

impl Config {
    /// Load the configuration from every source.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_dir = project_dirs().map(|dirs| dirs.config_dir().to_path_buf());
        Self::figment(config_dir.as_deref(), explicit)?.extract().or_raise(|| ErrorKind::Invalid)
    }

    fn figment(config_dir: Option<&Path>, explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(dir) = config_dir {
            figment = figment
                .merge(Toml::file(dir.join(format!("{CONFIG_STEM}.toml"))))
                .merge(Yaml::file(dir.join(format!("{CONFIG_STEM}.yaml"))))
                .merge(Json::file(dir.join(format!("{CONFIG_STEM}.json"))));
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::from(&self.endpoints)
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts::from(self.timeouts)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "sprite")
}

/// An unknown population mode is a warning, not a startup failure.
fn lenient_population<'de, D>(deserializer: D) -> std::result::Result<PopulationMode, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.parse().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "falling back to {}", PopulationMode::Automatic);
        PopulationMode::Automatic
    }))
}
