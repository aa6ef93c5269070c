//! Sprite catalog: cached atlas definitions expanded into atlases, sprite
//! groups and sprite keys.
//!
//! [`Catalog`] owns the published [`CatalogSnapshot`]; everything else in
//! here is a pure function of the cache directory's contents.

mod build;
mod consts;
pub mod error;
mod page;
mod parse;
mod snapshot;
mod source;
mod textures;

pub use crate::build::{Catalog, CatalogBuilder};
pub use crate::consts::{DEFAULT_NAMESPACE, TEXTURES_INDEX_FILE};
pub use crate::page::{Page, paginate};
pub use crate::parse::{group_key, parse_atlas};
pub use crate::snapshot::{AtlasEntry, CatalogSnapshot, SpriteGroup};
pub use crate::source::AtlasSource;
pub use crate::textures::TextureIndex;
