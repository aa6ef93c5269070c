//! Immutable catalog values handed to readers.

use crate::consts::DEFAULT_NAMESPACE;
use sprite_cache::ATLAS_SUFFIX;
use std::collections::HashMap;

/// Sprite keys considered variants of one logical sprite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteGroup {
    pub id: String,
    /// Unique and sorted.
    pub sprites: Vec<String>,
}
impl SpriteGroup {
    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

/// One parsed atlas definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasEntry {
    id: String,
    namespace: String,
    file_name: String,
    groups: Vec<SpriteGroup>,
    groups_by_id: HashMap<String, usize>,
    sprite_count: usize,
}

impl AtlasEntry {
    /// Build an entry from its groups, sorting them by id.
    pub fn new(namespace: impl Into<String>, file_name: impl Into<String>, mut groups: Vec<SpriteGroup>) -> Self {
        let namespace = namespace.into();
        let file_name = file_name.into();
        groups.sort_by(|a, b| a.id.cmp(&b.id));
        let groups_by_id = groups.iter().enumerate().map(|(i, group)| (group.id.clone(), i)).collect();
        let sprite_count = groups.iter().map(SpriteGroup::len).sum();
        let id = format!("{namespace}:{}", file_name.strip_suffix(ATLAS_SUFFIX).unwrap_or(&file_name));
        Self {
            id,
            namespace,
            file_name,
            groups,
            groups_by_id,
            sprite_count,
        }
    }

    /// `<namespace>:<name>`, e.g. `minecraft:blocks`.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn groups(&self) -> &[SpriteGroup] {
        &self.groups
    }

    pub fn sprite_count(&self) -> usize {
        self.sprite_count
    }

    /// Exact match on group id; no namespace fallback.
    pub fn lookup_group(&self, id: &str) -> Option<&SpriteGroup> {
        self.groups_by_id.get(id).map(|&i| &self.groups[i])
    }

    /// File name without the `.json` extension.
    pub fn simple_name(&self) -> &str {
        self.file_name.strip_suffix(ATLAS_SUFFIX).unwrap_or(&self.file_name)
    }

    pub fn is_default_namespace(&self) -> bool {
        self.namespace == DEFAULT_NAMESPACE
    }

    /// Simple name for default-namespace atlases, the full id otherwise.
    pub fn display_name(&self) -> &str {
        if self.is_default_namespace() { self.simple_name() } else { &self.id }
    }
}

/// Every atlas known at one point in time.
///
/// Never mutated after construction; a rebuild produces a new value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogSnapshot {
    atlases: Vec<AtlasEntry>,
    atlases_by_id: HashMap<String, usize>,
    total_sprites: usize,
}

impl CatalogSnapshot {
    /// Build a snapshot, sorting atlases by id.
    pub fn new(mut atlases: Vec<AtlasEntry>) -> Self {
        atlases.sort_by(|a, b| a.id.cmp(&b.id));
        let atlases_by_id = atlases.iter().enumerate().map(|(i, atlas)| (atlas.id.clone(), i)).collect();
        let total_sprites = atlases.iter().map(AtlasEntry::sprite_count).sum();
        Self {
            atlases,
            atlases_by_id,
            total_sprites,
        }
    }

    /// The "not refreshed yet" sentinel.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.atlases.is_empty()
    }

    pub fn atlases(&self) -> &[AtlasEntry] {
        &self.atlases
    }

    pub fn total_sprites(&self) -> usize {
        self.total_sprites
    }

    /// Exact id first, then `minecraft:<id>` if `id` has no namespace.
    pub fn lookup_atlas(&self, id: &str) -> Option<&AtlasEntry> {
        if id.is_empty() {
            return None;
        }
        if let Some(&i) = self.atlases_by_id.get(id) {
            return Some(&self.atlases[i]);
        }
        if id.contains(':') {
            return None;
        }
        let namespaced = format!("{DEFAULT_NAMESPACE}:{id}");
        self.atlases_by_id.get(&namespaced).map(|&i| &self.atlases[i])
    }

    /// Atlas names starting with `partial`, ignoring case.
    ///
    /// Offers the full id of every atlas, plus the simple name of
    /// default-namespace atlases. A blank `partial` matches everything.
    pub fn suggest_atlases(&self, partial: &str) -> Vec<&str> {
        let partial = partial.trim().to_lowercase();
        let matches = |candidate: &str| candidate.to_lowercase().starts_with(&partial);
        let mut suggestions = Vec::new();
        for atlas in &self.atlases {
            if matches(atlas.id()) {
                suggestions.push(atlas.id());
            }
            if atlas.is_default_namespace() && matches(atlas.simple_name()) {
                suggestions.push(atlas.simple_name());
            }
        }
        suggestions
    }
}
