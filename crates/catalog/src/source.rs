//! The `sources` entries of an atlas definition.

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// One entry of an atlas definition's `sources` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtlasSource {
    /// Every texture under `<namespace>/textures/<folder>/`, keyed as
    /// `prefix + relative path`.
    Directory { namespace: String, prefix: String, folder: String },
    /// Exactly one texture.
    Single { resource: String },
    /// Each base texture recoloured once per palette suffix.
    PalettedPermutations { textures: Vec<String>, suffixes: Vec<String> },
    /// A source type we don't expand (`filter`, `unstitch`, anything newer).
    Ignored { kind: String },
}

#[derive(Deserialize)]
struct DirectoryFields {
    source: String,
    #[serde(default)]
    prefix: String,
}

#[derive(Deserialize)]
struct SingleFields {
    resource: String,
}

#[derive(Deserialize)]
struct PalettedFields {
    #[serde(default)]
    textures: Vec<String>,
    #[serde(default)]
    permutations: Map<String, Value>,
}

impl AtlasSource {
    /// Interpret one `sources` entry of an atlas in `namespace`.
    ///
    /// The `type` tag may be namespaced (`minecraft:directory`); only the part
    /// after the last `:` is looked at. A recognised type whose required
    /// field is missing is an error rather than silently producing nothing.
    pub fn from_json(namespace: &str, value: &Value) -> Result<Self> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_raise(|| ErrorKind::InvalidSource("missing type"))?;
        let bare = kind.rsplit(':').next().unwrap_or(kind);
        let source = match bare {
            "directory" => {
                let fields: DirectoryFields = fields(value, "directory source needs a `source` folder")?;
                Self::Directory {
                    namespace: namespace.to_string(),
                    prefix: fields.prefix,
                    folder: fields.source,
                }
            },
            "single" => {
                let fields: SingleFields = fields(value, "single source needs a `resource`")?;
                Self::Single {
                    resource: fields.resource,
                }
            },
            "paletted_permutations" => {
                let fields: PalettedFields = fields(value, "paletted permutations need string textures")?;
                let suffixes = fields
                    .permutations
                    .keys()
                    .map(|key| key.trim())
                    .filter(|key| !key.is_empty())
                    .map(str::to_string)
                    .collect();
                Self::PalettedPermutations {
                    textures: fields.textures,
                    suffixes,
                }
            },
            _ => Self::Ignored { kind: kind.to_string() },
        };
        Ok(source)
    }
}

fn fields<T: DeserializeOwned>(value: &Value, reason: &'static str) -> Result<T> {
    T::deserialize(value).or_raise(|| ErrorKind::InvalidSource(reason))
}
