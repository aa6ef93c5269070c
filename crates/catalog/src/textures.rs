//! Known texture paths, bucketed by namespace.

use crate::consts::{PNG_SUFFIX, TEXTURES_SEGMENT};
use std::collections::HashMap;

/// Sorted texture paths (`<namespace>/textures/.../<name>.png`) per namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureIndex {
    by_namespace: HashMap<String, Vec<String>>,
}

impl TextureIndex {
    /// Keep the `.png` paths under a `/textures/` segment and bucket them by
    /// their first path segment. Paths without a namespace are dropped.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut by_namespace: HashMap<String, Vec<String>> = HashMap::new();
        for path in paths {
            let path = path.as_ref();
            if !path.contains(TEXTURES_SEGMENT) || !path.ends_with(PNG_SUFFIX) {
                continue;
            }
            match path.split_once('/') {
                Some((namespace, _)) if !namespace.is_empty() => {
                    by_namespace.entry(namespace.to_string()).or_default().push(path.to_string());
                },
                _ => continue,
            }
        }
        for textures in by_namespace.values_mut() {
            textures.sort();
        }
        Self { by_namespace }
    }

    /// Textures of one namespace; empty if the namespace is unknown.
    pub fn namespace(&self, namespace: &str) -> &[String] {
        self.by_namespace.get(namespace).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_namespace.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_namespace.is_empty()
    }
}

/// Lines of a `textures.index` file: trimmed, blanks dropped, `\` turned
/// into `/`.
pub(crate) fn parse_textures_index(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.replace('\\', "/"))
        .collect()
}
