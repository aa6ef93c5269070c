//! Atlas extraction from the client archive.

use crate::error::{ErrorKind, Result};
use crate::is_atlas_path;
use exn::ResultExt;
use sprite_storage::validate_path;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use zip::ZipArchive;

/// Directory inside the archive that mirrors the cache root.
const ASSETS_PREFIX: &str = "assets/";

/// Map an archive entry name to its path under the cache root.
///
/// `assets/minecraft/atlases/blocks.json` becomes
/// `minecraft/atlases/blocks.json`; anything outside `assets/`, or that isn't
/// an atlas definition, is `None`.
pub(crate) fn atlas_entry_path(name: &str) -> Option<PathBuf> {
    let relative = name.strip_prefix(ASSETS_PREFIX)?;
    if !is_atlas_path(name) {
        return None;
    }
    validate_path(relative).ok()
}

/// Pull every atlas definition out of an in-memory archive.
///
/// Decompression is CPU-bound, so it runs on the blocking pool.
pub(crate) async fn extract_atlases(archive: Vec<u8>) -> Result<Vec<(PathBuf, Vec<u8>)>> {
    tokio::task::spawn_blocking(move || extract_atlases_blocking(&archive)).await.or_raise(|| ErrorKind::Extraction)?
}

fn extract_atlases_blocking(archive: &[u8]) -> Result<Vec<(PathBuf, Vec<u8>)>> {
    let mut zip = ZipArchive::new(Cursor::new(archive)).or_raise(|| ErrorKind::Extraction)?;
    let mut extracted = Vec::new();
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).or_raise(|| ErrorKind::Extraction)?;
        if entry.is_dir() {
            continue;
        }
        let Some(path) = atlas_entry_path(entry.name()) else {
            continue;
        };
        let mut data = Vec::new();
        entry.read_to_end(&mut data).or_raise(|| ErrorKind::Extraction)?;
        tracing::trace!(path = %path.display(), bytes = data.len(), "extracted atlas");
        extracted.push((path, data));
    }
    Ok(extracted)
}
