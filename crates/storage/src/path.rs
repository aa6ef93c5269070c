//! Path validation and normalisation.
//!
//! Every path handed to a backend is relative to the cache root. These
//! helpers stop relative paths from escaping that root and turn them into
//! the forward-slash form that atlas and texture keys are compared in.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a storage path for security and correctness.
/// Ensures that paths don't escape the storage root (no `..` traversal).
///
/// > **Note:** This does **not** normalize backslashes or non-UTF8 bytes.
/// >           Null bytes are explicitly rejected.
///
/// # Returns
/// Returns the normalized path if valid, or [`InvalidPath`](crate::error::ErrorKind::InvalidPath)
/// if invalid.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use sprite_storage::validate_path;
/// // Valid paths
/// assert!(validate_path("minecraft/atlases/blocks.json").is_ok());
/// assert!(validate_path("jar-cache/1.21.4.jar").is_ok());
/// assert!(validate_path("minecraft/../asset-index.json").is_ok()); // (never leaves cache root)
/// // Invalid paths
/// assert!(validate_path("../config.toml").is_err());
/// assert!(validate_path("a/../../b").is_err());
/// assert!(validate_path("a\0b").is_err());
/// // Paths get resolved
/// assert_eq!(
///     validate_path("minecraft/./atlases//blocks.json/").unwrap(),
///     Path::new("minecraft/atlases/blocks.json")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let mut components = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls; reject them explicitly.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

/// Render a relative storage path as a `/`-separated string.
///
/// Asset keys (`minecraft/atlases/blocks.json`) always use forward slashes,
/// whatever the host platform writes. Returns `None` for non-UTF-8 paths,
/// which can never match an asset key anyway.
pub fn to_slash(path: impl AsRef<Path>) -> Option<String> {
    let mut out = String::new();
    for component in path.as_ref().components() {
        if let Component::Normal(s) = component {
            if !out.is_empty() {
                out.push('/');
            }
            out.push_str(s.to_str()?);
        }
    }
    Some(out)
}
