//! Cache directory on the local filesystem.
//!
//! All I/O goes through `tokio::fs`. Writes land in a hidden sibling file
//! first and are renamed over the target, so a reader (or a crash) never
//! leaves a half-written atlas behind.

use crate::backend::FileInfoStream;
use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use crate::{FileInfo, StorageBackend};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, ReadDir};

/// Cache directory rooted at an absolute path.
///
/// # Examples
///
/// ```no_run
/// use sprite_storage::backend::LocalBackend;
///
/// # fn example() -> sprite_storage::error::Result<()> {
/// let backend = LocalBackend::new("atlas-cache", "/srv/sprite/atlas-cache")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}

impl LocalBackend {
    /// Open the cache directory at `root`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPath`](ErrorKind::InvalidPath) if the path is not
    /// absolute or points at something that isn't a directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() || (root.exists() && !root.is_dir()) {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        // Blocking, but only ever runs once at startup.
        std::fs::create_dir_all(&root).map_err(io_error(&root))?;
        Ok(Self { name: name.into(), root })
    }

    /// Root directory this backend is confined to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        Ok(self.root.join(validate_path(path.as_ref())?))
    }

    fn relative_path(&self, absolute: impl AsRef<Path>) -> Result<PathBuf> {
        let absolute = absolute.as_ref();
        let relative = absolute.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!("{} is outside the cache root {}", absolute.display(), self.root.display()))
        })?;
        validate_path(relative)
    }

    async fn ensure_parent(&self, absolute: &Path, reported: &Path) -> Result<()> {
        match absolute.parent() {
            Some(parent) => Ok(fs::create_dir_all(parent).await.map_err(io_error(reported))?),
            None => Ok(()),
        }
    }
}

/// Map an I/O failure on `path` to the matching storage error.
fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ErrorKind + '_ {
    move |e| match e.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
        _ => ErrorKind::Io(e),
    }
}

/// `minecraft/atlases/blocks.json` → `minecraft/atlases/.blocks.json.tmp`.
fn staging_path(target: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(target.file_name().unwrap_or_default());
    name.push(".tmp");
    target.with_file_name(name)
}

/// Depth-first walk over the regular files below a directory.
struct Walker<'a> {
    backend: &'a LocalBackend,
    prefix: Option<PathBuf>,
    pending: Vec<PathBuf>,
    current: Option<(PathBuf, ReadDir)>,
}

impl<'a> Walker<'a> {
    fn new(backend: &'a LocalBackend, start: PathBuf, prefix: Option<PathBuf>) -> Self {
        Self {
            backend,
            prefix,
            pending: vec![start],
            current: None,
        }
    }

    /// Next file, or `None` once every directory has been visited.
    async fn next(&mut self) -> Option<Result<FileInfo>> {
        loop {
            if self.current.is_none() {
                let dir = self.pending.pop()?;
                let listing = fs::read_dir(&dir).await;
                match listing {
                    Ok(entries) => self.current = Some((dir, entries)),
                    // A directory that doesn't exist has no files in it.
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {},
                    Err(e) => return Some(Err(io_error(&dir)(e).into())),
                }
                continue;
            }
            let Some((dir, entries)) = self.current.as_mut() else {
                continue;
            };
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => {
                    self.current = None;
                    continue;
                },
                Err(e) => return Some(Err(io_error(dir)(e).into())),
            };
            match self.visit(entry.path()).await {
                Ok(Some(file)) => return Some(Ok(file)),
                Ok(None) => {},
                Err(e) => return Some(Err(e)),
            }
        }
    }

    async fn visit(&mut self, path: PathBuf) -> Result<Option<FileInfo>> {
        let metadata = fs::symlink_metadata(&path).await.map_err(io_error(&path))?;
        let relative = self.backend.relative_path(&path)?;
        if self.prefix.as_ref().is_some_and(|prefix| !relative.starts_with(prefix)) {
            return Ok(None);
        }
        if metadata.is_dir() {
            self.pending.push(path);
            return Ok(None);
        }
        if !metadata.is_file() {
            return Ok(None);
        }
        Ok(Some(FileInfo::new(relative, metadata.len())))
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let prefix = match prefix.map(validate_path).transpose() {
            Ok(prefix) => prefix,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };
        // Start at the prefix's parent: its leaf may be a file or not exist
        // yet. Path::starts_with is component-based, so `minecraft/atlases`
        // never matches `minecraft/atlases-old/x.json`.
        let start = match &prefix {
            Some(prefix) => self.root.join(prefix).parent().map_or_else(|| self.root.clone(), Path::to_path_buf),
            None => self.root.clone(),
        };
        let mut walker = Walker::new(self, start, prefix);
        Box::pin(stream! {
            while let Some(item) = walker.next().await {
                yield item;
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let absolute = self.absolute_path(path)?;
        Ok(fs::try_exists(&absolute).await.map_err(io_error(path))?)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let absolute = self.absolute_path(path)?;
        Ok(fs::read(&absolute).await.map_err(io_error(path))?)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let absolute = self.absolute_path(path)?;
        self.ensure_parent(&absolute, path).await?;
        let staging = staging_path(&absolute);
        fs::write(&staging, data).await.map_err(io_error(path))?;
        if let Err(e) = fs::rename(&staging, &absolute).await {
            let _ = fs::remove_file(&staging).await;
            exn::bail!(io_error(path)(e));
        }
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let absolute = self.absolute_path(path)?;
        Ok(fs::remove_file(&absolute).await.map_err(io_error(path))?)
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let source = self.absolute_path(from)?;
        let target = self.absolute_path(to)?;
        self.ensure_parent(&target, to).await?;
        Ok(fs::rename(&source, &target).await.map_err(io_error(from))?)
    }
}
