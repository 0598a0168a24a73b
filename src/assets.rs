//! # Static asset server
//!
//! Resolves a path captured by the `/static/*path` route against the asset
//! root and returns the file's bytes with a content type inferred from the
//! extension. Paths that try to leave the root are rejected twice: once
//! lexically (`..`, absolute paths) and once after canonicalization, which also
//! catches symlinks pointing outside.

use std::{
    fs,
    path::{Component, Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, OnceLock},
};

use bytes::Bytes;
use log::{debug, error, info, warn};

use crate::{cache::FileCache, exception::Exception, param::mime_for_extension};

/// Files larger than this are never kept in the cache.
const CACHE_THRESHOLD: u64 = 1024 * 1024;

/// A file ready to be sent.
#[derive(Debug, Clone)]
pub struct Asset {
    pub content: Bytes,
    pub content_type: &'static str,
}

pub struct AssetServer {
    /// Absolute, but not necessarily canonical
    root: PathBuf,
    /// Set once the root has been canonicalized successfully
    canonical_root: OnceLock<PathBuf>,
    cache: Arc<Mutex<FileCache>>,
}

impl AssetServer {
    /// A missing root is not fatal: the server starts and every asset request
    /// answers 404 until the directory appears.
    pub fn new(root: impl AsRef<Path>, cache_size: usize) -> Self {
        let root = root.as_ref();
        let canonical_root = OnceLock::new();
        let root = match root.canonicalize() {
            Ok(p) => {
                let _ = canonical_root.set(p.clone());
                p
            }
            Err(e) => {
                warn!("asset root {} is not accessible: {}", root.display(), e);
                // relative roots are pinned to the startup working directory
                std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf())
            }
        };
        Self {
            root,
            canonical_root,
            cache: Arc::new(Mutex::new(FileCache::from_capacity(cache_size))),
        }
    }

    pub fn root(&self) -> &Path {
        self.canonical_root.get().unwrap_or(&self.root)
    }

    /// The canonical root, retried on every call until the directory exists.
    fn resolved_root(&self, id: u128) -> Result<&Path, Exception> {
        if let Some(root) = self.canonical_root.get() {
            return Ok(root.as_path());
        }
        match self.root.canonicalize() {
            Ok(p) => {
                info!("[ID{}]asset root {} is now available", id, p.display());
                Ok(self.canonical_root.get_or_init(|| p).as_path())
            }
            Err(_) => Err(Exception::AssetNotFound),
        }
    }

    /// Load `relative` (the part after `/static/`) from the asset root.
    pub fn load(&self, relative: &str, id: u128) -> Result<Asset, Exception> {
        let file_path = self.resolve(relative, id)?;

        let metadata = match fs::metadata(&file_path) {
            Ok(m) if m.is_file() => m,
            Ok(_) => {
                debug!("[ID{}]{} is not a regular file", id, file_path.display());
                return Err(Exception::AssetNotFound);
            }
            Err(_) => return Err(Exception::AssetNotFound),
        };
        let content_type = mime_for_extension(file_path.extension().and_then(|e| e.to_str()));
        let key = file_path.to_string_lossy().into_owned();

        let modified = metadata.modified().ok();
        if let Some(modified) = modified {
            if let Some(content) = self.lock_cache(id).find(&key, modified) {
                debug!("[ID{}]asset cache hit: {}", id, key);
                return Ok(Asset {
                    content,
                    content_type,
                });
            }
        }

        debug!("[ID{}]reading asset {}", id, key);
        let content = match fs::read(&file_path) {
            Ok(c) => Bytes::from(c),
            Err(e) => {
                error!("[ID{}]failed to read {}: {}", id, key, e);
                return Err(Exception::InternalError);
            }
        };

        if let Some(modified) = modified {
            if FileCache::should_cache(metadata.len(), CACHE_THRESHOLD) {
                self.lock_cache(id).push(&key, content.clone(), modified);
            }
        }

        Ok(Asset {
            content,
            content_type,
        })
    }

    /// Map `relative` to an existing path inside the root.
    fn resolve(&self, relative: &str, id: u128) -> Result<PathBuf, Exception> {
        let relative_path = Path::new(relative);
        for component in relative_path.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    warn!("[ID{}]path traversal attempt blocked: {:?}", id, relative);
                    return Err(Exception::InvalidPath);
                }
            }
        }

        let root = self.resolved_root(id)?;
        let canonical = root
            .join(relative_path)
            .canonicalize()
            .map_err(|_| Exception::AssetNotFound)?;
        if !canonical.starts_with(root) {
            warn!(
                "[ID{}]asset {:?} resolves outside the root: {}",
                id,
                relative,
                canonical.display()
            );
            return Err(Exception::InvalidPath);
        }
        Ok(canonical)
    }

    fn lock_cache(&self, id: u128) -> MutexGuard<'_, FileCache> {
        match self.cache.lock() {
            Ok(lock) => lock,
            Err(poisoned) => {
                warn!("[ID{}]asset cache lock was poisoned, recovering", id);
                poisoned.into_inner()
            }
        }
    }
}
