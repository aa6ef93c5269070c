//! Expansion of one atlas definition into sprite groups.

use crate::consts::{NUMBERED_LEAF_REGEX, PNG_SUFFIX};
use crate::error::{ErrorKind, Result};
use crate::snapshot::{AtlasEntry, SpriteGroup};
use crate::source::AtlasSource;
use exn::{OptionExt, ResultExt};
use serde_json::Value;
use sprite_cache::ATLAS_SUFFIX;
use std::collections::{BTreeMap, BTreeSet};

/// Parse the atlas definition `file_name` of `namespace`.
///
/// `textures` are the known texture paths of that namespace (sorted, as
/// produced by [`TextureIndex`](crate::TextureIndex)); directory sources are
/// resolved against them.
pub fn parse_atlas(namespace: &str, file_name: &str, bytes: &[u8], textures: &[String]) -> Result<AtlasEntry> {
    let atlas_id = || {
        ErrorKind::MalformedAtlas(format!("{namespace}:{}", file_name.strip_suffix(ATLAS_SUFFIX).unwrap_or(file_name)))
    };
    let root: Value = serde_json::from_slice(bytes).or_raise(atlas_id)?;
    let sources = root.get("sources").and_then(Value::as_array).ok_or_raise(atlas_id)?;

    let mut groups = GroupBuilder::default();
    for value in sources {
        match AtlasSource::from_json(namespace, value).or_raise(atlas_id)? {
            AtlasSource::Directory {
                namespace,
                prefix,
                folder,
            } => {
                let root = texture_root(&namespace, &folder);
                for texture in textures {
                    let Some(relative) = texture.strip_prefix(&root) else {
                        continue;
                    };
                    let Some(stem) = relative.strip_suffix(PNG_SUFFIX) else {
                        continue;
                    };
                    groups.add(&format!("{prefix}{stem}"), None);
                }
            },
            AtlasSource::Single { resource } => groups.add(&strip_namespace(&resource), None),
            AtlasSource::PalettedPermutations { textures, suffixes } => {
                for texture in &textures {
                    let base = strip_namespace(texture);
                    for suffix in &suffixes {
                        groups.add(&format!("{base}_{suffix}"), Some(&base));
                    }
                }
            },
            AtlasSource::Ignored { kind } => {
                tracing::debug!(namespace, file_name, %kind, "ignoring unsupported atlas source");
            },
        }
    }
    Ok(AtlasEntry::new(namespace, file_name, groups.build()))
}

/// Group a sprite key belongs to.
///
/// A leaf ending in `_<digits>` (an animation frame or numbered variant)
/// joins the group named after its stem; anything else is its own group.
///
/// ```
/// use sprite_catalog::group_key;
///
/// assert_eq!(group_key("blocks/grass_10"), "blocks/grass");
/// assert_eq!(group_key("blocks/dirt"), "blocks/dirt");
/// assert_eq!(group_key("blocks_1/dirt"), "blocks_1/dirt");
/// ```
pub fn group_key(sprite_key: &str) -> String {
    let (directory, leaf) = match sprite_key.rfind('/') {
        Some(slash) => sprite_key.split_at(slash + 1),
        None => ("", sprite_key),
    };
    match NUMBERED_LEAF_REGEX.captures(leaf).and_then(|captures| captures.get(1)) {
        Some(stem) => format!("{directory}{}", stem.as_str()),
        None => sprite_key.to_string(),
    }
}

/// `<namespace>/textures/<folder>/`, tolerating stray slashes in `folder`.
fn texture_root(namespace: &str, folder: &str) -> String {
    match folder.trim_matches('/') {
        "" => format!("{namespace}/textures/"),
        folder => format!("{namespace}/textures/{folder}/"),
    }
}

/// `minecraft:entity/banner_base.png` → `entity/banner_base`.
fn strip_namespace(resource: &str) -> String {
    let path = resource.split_once(':').map_or(resource, |(_, path)| path);
    path.strip_suffix(PNG_SUFFIX).unwrap_or(path).to_string()
}

#[derive(Default)]
struct GroupBuilder {
    groups: BTreeMap<String, BTreeSet<String>>,
}
impl GroupBuilder {
    fn add(&mut self, sprite_key: &str, group: Option<&str>) {
        let sprite_key = sprite_key.replace('\\', "/");
        let group = group.map_or_else(|| group_key(&sprite_key), str::to_string);
        self.groups.entry(group).or_default().insert(sprite_key);
    }

    fn build(self) -> Vec<SpriteGroup> {
        self.groups
            .into_iter()
            .map(|(id, sprites)| SpriteGroup {
                id,
                sprites: sprites.into_iter().collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn textures(paths: &[&str]) -> Vec<String> {
        let mut paths: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
        paths.sort();
        paths
    }

    fn group_ids(entry: &AtlasEntry) -> Vec<&str> {
        entry.groups().iter().map(|g| g.id.as_str()).collect()
    }

    #[rstest]
    #[case("blocks/grass_1", "blocks/grass")]
    #[case("blocks/grass_2", "blocks/grass")]
    #[case("blocks/grass_10", "blocks/grass")]
    #[case("blocks/dirt", "blocks/dirt")]
    #[case("level_42", "level")]
    #[case("blocks/_1", "blocks/_1")]
    #[case("blocks/grass_", "blocks/grass_")]
    #[case("blocks/grass_1a", "blocks/grass_1a")]
    #[case("a/b_1_2", "a/b_1")]
    fn test_group_key(#[case] sprite_key: &str, #[case] expected: &str) {
        assert_eq!(group_key(sprite_key), expected);
    }

    #[rstest]
    #[case("minecraft:entity/banner_base", "entity/banner_base")]
    #[case("entity/banner_base.png", "entity/banner_base")]
    #[case("modded:gui/widget.png", "gui/widget")]
    fn test_strip_namespace(#[case] resource: &str, #[case] expected: &str) {
        assert_eq!(strip_namespace(resource), expected);
    }

    #[rstest]
    #[case("block", "minecraft/textures/block/")]
    #[case("/block/", "minecraft/textures/block/")]
    #[case("", "minecraft/textures/")]
    fn test_texture_root(#[case] folder: &str, #[case] expected: &str) {
        assert_eq!(texture_root("minecraft", folder), expected);
    }

    #[test]
    fn test_directory_source() {
        let known = textures(&[
            "minecraft/textures/block/stone.png",
            "minecraft/textures/block/dirt.png",
            "minecraft/textures/block/grass_1.png",
            "minecraft/textures/block/grass_2.png",
            "minecraft/textures/block/grass_10.png",
            "minecraft/textures/block/sub/deep.png",
            "minecraft/textures/item/apple.png",
        ]);
        let json = br#"{"sources":[{"type":"minecraft:directory","source":"block","prefix":"block/"}]}"#;
        let entry = parse_atlas("minecraft", "blocks.json", json, &known).unwrap();
        assert_eq!(entry.id(), "minecraft:blocks");
        assert_eq!(group_ids(&entry), vec!["block/dirt", "block/grass", "block/stone", "block/sub/deep"]);
        assert_eq!(
            entry.lookup_group("block/grass").unwrap().sprites,
            vec!["block/grass_1", "block/grass_10", "block/grass_2"]
        );
        assert_eq!(entry.sprite_count(), 6);
    }

    #[test]
    fn test_directory_at_texture_root() {
        let known = textures(&["minecraft/textures/block/stone.png", "minecraft/textures/block/dirt.png"]);
        let json = br#"{"sources":[{"type":"minecraft:directory","source":"","prefix":""}]}"#;
        let entry = parse_atlas("minecraft", "blocks.json", json, &known).unwrap();
        assert_eq!(group_ids(&entry), vec!["block/dirt", "block/stone"]);
        assert_eq!(entry.sprite_count(), 2);
    }

    #[test]
    fn test_single_sources_are_deduplicated() {
        let json = br#"{"sources":[
            {"type":"minecraft:single","resource":"minecraft:entity/conduit/wind"},
            {"type":"single","resource":"entity/conduit/wind.png"},
            {"type":"minecraft:single","resource":"minecraft:entity/conduit/wind_vertical"}
        ]}"#;
        let entry = parse_atlas("minecraft", "blocks.json", json, &[]).unwrap();
        assert_eq!(group_ids(&entry), vec!["entity/conduit/wind", "entity/conduit/wind_vertical"]);
        assert_eq!(entry.sprite_count(), 2);
    }

    #[test]
    fn test_paletted_permutations_share_base_group() {
        let json = br#"{"sources":[{
            "type":"minecraft:paletted_permutations",
            "textures":["minecraft:entity/banner_base"],
            "palette_key":"minecraft:colormap/banner",
            "permutations":{"red":"minecraft:colormap/red","blue":"minecraft:colormap/blue"}
        }]}"#;
        let entry = parse_atlas("minecraft", "banner_patterns.json", json, &[]).unwrap();
        assert_eq!(group_ids(&entry), vec!["entity/banner_base"]);
        assert_eq!(
            entry.lookup_group("entity/banner_base").unwrap().sprites,
            vec!["entity/banner_base_blue", "entity/banner_base_red"]
        );
    }

    #[test]
    fn test_numbered_palette_suffix_is_not_split() {
        let json = br#"{"sources":[{
            "type":"minecraft:paletted_permutations",
            "textures":["trims/item/helmet"],
            "permutations":{"1":"a","2":"b"}
        }]}"#;
        let entry = parse_atlas("minecraft", "armor_trims.json", json, &[]).unwrap();
        assert_eq!(group_ids(&entry), vec!["trims/item/helmet"]);
        assert_eq!(entry.sprite_count(), 2);
    }

    #[test]
    fn test_empty_permutations_yield_nothing() {
        let json = br#"{"sources":[{"type":"minecraft:paletted_permutations","textures":["a/b"],"permutations":{}}]}"#;
        let entry = parse_atlas("minecraft", "x.json", json, &[]).unwrap();
        assert!(entry.groups().is_empty());
    }

    #[test]
    fn test_unknown_sources_are_skipped() {
        let json = br#"{"sources":[
            {"type":"minecraft:filter","pattern":{"namespace":"minecraft"}},
            {"type":"minecraft:single","resource":"minecraft:block/stone"}
        ]}"#;
        let entry = parse_atlas("minecraft", "blocks.json", json, &[]).unwrap();
        assert_eq!(group_ids(&entry), vec!["block/stone"]);
    }

    #[test]
    fn test_backslashes_are_normalised() {
        let json = br#"{"sources":[{"type":"minecraft:single","resource":"minecraft:block\\stone"}]}"#;
        let entry = parse_atlas("minecraft", "blocks.json", json, &[]).unwrap();
        assert_eq!(group_ids(&entry), vec!["block/stone"]);
    }

    #[rstest]
    #[case(b"not json")]
    #[case(b"[]")]
    #[case(br#"{"textures":[]}"#)]
    #[case(br#"{"sources":{}}"#)]
    #[case(br#"{"sources":[{"type":"minecraft:directory"}]}"#)]
    fn test_malformed_atlas(#[case] json: &[u8]) {
        let err = parse_atlas("minecraft", "blocks.json", json, &[]).unwrap_err();
        assert!(matches!(&*err, ErrorKind::MalformedAtlas(id) if id == "minecraft:blocks"));
    }
}
