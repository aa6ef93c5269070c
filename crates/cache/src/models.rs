//! Remote documents and the persisted cache fingerprint.
//!
//! Only the fields the pipeline actually reads are modelled; anything else in
//! the upstream JSON is ignored, except in [`AssetIndex`] which keeps unknown
//! top-level fields so the persisted copy round-trips faithfully.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use sprite_storage::hash_matches;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use time::UtcDateTime;

/// Top-level version manifest: every released version and where its
/// metadata lives.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionManifest {
    pub versions: Vec<VersionEntry>,
}
impl VersionManifest {
    pub fn find(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    pub id: String,
    pub url: String,
}

/// Per-version metadata document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionMetadata {
    pub asset_index: Option<AssetIndexRef>,
    pub downloads: Option<Downloads>,
}
impl VersionMetadata {
    /// URL and SHA-1 of the client archive, if both are present.
    pub fn client_download(&self) -> Option<(&str, &str)> {
        let client = self.downloads.as_ref()?.client.as_ref()?;
        Some((client.url.as_deref()?, client.sha1.as_deref()?))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndexRef {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Downloads {
    pub client: Option<Download>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Download {
    pub url: Option<String>,
    pub sha1: Option<String>,
}

/// Asset index: logical asset path → content hash.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetIndex {
    #[serde(default)]
    pub objects: BTreeMap<String, AssetObject>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
impl AssetIndex {
    /// Objects whose path looks like an atlas definition.
    pub fn atlas_objects(&self) -> impl Iterator<Item = (&str, &AssetObject)> {
        self.objects
            .iter()
            .filter(|(path, _)| crate::is_atlas_path(path))
            .map(|(path, object)| (path.as_str(), object))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    #[serde(default)]
    pub size: u64,
}

/// Persisted record of which archive the cached atlases were extracted from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub version: String,
    pub jar_sha1: String,
    /// Milliseconds since the Unix epoch.
    pub extracted_at: i64,
}
impl Fingerprint {
    pub fn new(version: impl Into<String>, jar_sha1: impl Into<String>) -> Self {
        let millis = UtcDateTime::now().unix_timestamp_nanos() / 1_000_000;
        Self {
            version: version.into(),
            jar_sha1: jar_sha1.into(),
            extracted_at: i64::try_from(millis).unwrap_or(i64::MAX),
        }
    }

    /// Whether this fingerprint describes exactly `version` and `jar_sha1`.
    pub fn matches(&self, version: &str, jar_sha1: &str) -> bool {
        self.version == version && hash_matches(&self.jar_sha1, jar_sha1)
    }
}

/// How atlas definitions get into the cache directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopulationMode {
    /// Download the client archive and extract every atlas definition.
    #[default]
    Automatic,
    /// An operator places atlas files under the cache root themselves.
    Manual,
    /// Download each atlas object listed in the asset index by its hash.
    Objects,
}
impl fmt::Display for PopulationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Automatic => "automatic",
            Self::Manual => "manual",
            Self::Objects => "objects",
        })
    }
}

#[derive(Debug, Display, Error)]
#[display("unknown population mode: {_0}")]
pub struct UnknownPopulationMode(#[error(not(source))] pub String);

impl FromStr for PopulationMode {
    type Err = UnknownPopulationMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "automatic" => Ok(Self::Automatic),
            "manual" => Ok(Self::Manual),
            "objects" => Ok(Self::Objects),
            _ => Err(UnknownPopulationMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_client_download_requires_url_and_sha1() {
        let metadata: VersionMetadata = serde_json::from_str(
            r#"{"assetIndex":{"url":"https://example.invalid/index.json"},"downloads":{"client":{"url":"https://example.invalid/client.jar"}}}"#,
        )
        .unwrap();
        assert!(metadata.asset_index.is_some());
        assert_eq!(metadata.client_download(), None);

        let metadata: VersionMetadata = serde_json::from_str(
            r#"{"downloads":{"client":{"url":"https://example.invalid/client.jar","sha1":"abc"}}}"#,
        )
        .unwrap();
        assert_eq!(metadata.client_download(), Some(("https://example.invalid/client.jar", "abc")));
        assert!(metadata.asset_index.is_none());
    }

    #[test]
    fn test_asset_index_keeps_unknown_fields() {
        let json = r#"{"map_to_resources":false,"objects":{"minecraft/atlases/blocks.json":{"hash":"abc123","size":10}}}"#;
        let index: AssetIndex = serde_json::from_str(json).unwrap();
        assert_eq!(index.objects["minecraft/atlases/blocks.json"].hash, "abc123");
        let round_trip: serde_json::Value = serde_json::to_value(&index).unwrap();
        assert_eq!(round_trip["map_to_resources"], serde_json::Value::Bool(false));
    }

    #[test]
    fn test_asset_index_without_objects_is_empty() {
        let index: AssetIndex = serde_json::from_str("{}").unwrap();
        assert!(index.objects.is_empty());
    }

    #[test]
    fn test_atlas_objects() {
        let json = r#"{"objects":{
            "minecraft/atlases/blocks.json":{"hash":"aa"},
            "minecraft/textures/block/stone.png":{"hash":"bb"},
            "minecraft/atlases/readme.txt":{"hash":"cc"}
        }}"#;
        let index: AssetIndex = serde_json::from_str(json).unwrap();
        let atlases: Vec<&str> = index.atlas_objects().map(|(path, _)| path).collect();
        assert_eq!(atlases, vec!["minecraft/atlases/blocks.json"]);
    }

    #[test]
    fn test_fingerprint_json_shape() {
        let fingerprint = Fingerprint {
            version: "1.21.4".to_string(),
            jar_sha1: "ABC".to_string(),
            extracted_at: 1_700_000_000_000,
        };
        let json = serde_json::to_value(&fingerprint).unwrap();
        assert_eq!(json["jarSha1"], "ABC");
        assert_eq!(json["extractedAt"], 1_700_000_000_000_i64);
    }

    #[rstest]
    #[case("1.21.4", "abc", true)]
    #[case("1.21.4", "ABC", true)]
    #[case("1.21.5", "abc", false)]
    #[case("1.21.4", "abd", false)]
    fn test_fingerprint_matches(#[case] version: &str, #[case] hash: &str, #[case] expected: bool) {
        let fingerprint = Fingerprint::new("1.21.4", "aBc");
        assert_eq!(fingerprint.matches(version, hash), expected);
        assert!(fingerprint.extracted_at > 0);
    }

    #[rstest]
    #[case("automatic", Some(PopulationMode::Automatic))]
    #[case("MANUAL", Some(PopulationMode::Manual))]
    #[case(" objects ", Some(PopulationMode::Objects))]
    #[case("sometimes", None)]
    fn test_population_mode_from_str(#[case] input: &str, #[case] expected: Option<PopulationMode>) {
        assert_eq!(input.parse::<PopulationMode>().ok(), expected);
    }
}
