//! Plain-text rendering of catalog views.

use sprite_catalog::{AtlasEntry, CatalogSnapshot, Page, SpriteGroup};
use std::fmt::Write;

const NOT_REFRESHED: &str = "No atlases cached yet. Run `sprite refresh` first.";

pub fn atlases(snapshot: &CatalogSnapshot, page: &Page<'_, AtlasEntry>) -> String {
    if snapshot.is_empty() {
        return NOT_REFRESHED.to_string();
    }
    let mut out = format!(
        "{} atlases, {} sprites (page {}/{})\n",
        snapshot.atlases().len(),
        snapshot.total_sprites(),
        page.page,
        page.total_pages
    );
    for atlas in page.items {
        let _ = writeln!(out, "  {:<32} {:>6} sprites", atlas.display_name(), atlas.sprite_count());
    }
    footer(&mut out, page);
    out
}

pub fn groups(atlas: &AtlasEntry, page: &Page<'_, SpriteGroup>) -> String {
    let mut out = format!(
        "{}: {} groups, {} sprites (page {}/{})\n",
        atlas.id(),
        atlas.groups().len(),
        atlas.sprite_count(),
        page.page,
        page.total_pages
    );
    for group in page.items {
        match group.len() {
            1 => {
                let _ = writeln!(out, "  {}", group.id);
            },
            n => {
                let _ = writeln!(out, "  {} ({n} variants)", group.id);
            },
        }
    }
    footer(&mut out, page);
    out
}

pub fn preview(atlas: &AtlasEntry, group: &SpriteGroup) -> String {
    let mut out = format!("{} / {}\n", atlas.id(), group.id);
    for sprite in &group.sprites {
        let _ = writeln!(out, "  {}:{sprite}", atlas.namespace());
    }
    out
}

fn footer<T>(out: &mut String, page: &Page<'_, T>) {
    match (page.has_previous(), page.has_next()) {
        (false, false) => {},
        (true, false) => {
            let _ = writeln!(out, "  <- --page {}", page.page - 1);
        },
        (false, true) => {
            let _ = writeln!(out, "  --page {} ->", page.page + 1);
        },
        (true, true) => {
            let _ = writeln!(out, "  <- --page {} | --page {} ->", page.page - 1, page.page + 1);
        },
    }
}
