use std::num::NonZeroUsize;
use std::time::SystemTime;

use bytes::Bytes;
use lru::LruCache;

#[derive(Clone)]
struct CacheEntry {
    content: Bytes,
    modified_time: SystemTime,
}

/// LRU cache of static file contents, keyed by the resolved file path.
///
/// An entry is only served while the file's modification time matches the one
/// recorded when it was cached.
pub struct FileCache {
    cache: LruCache<String, CacheEntry>,
}

impl FileCache {
    // capacity 0 is replaced by 1
    pub fn from_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
        }
    }

    pub fn push(&mut self, filename: &str, bytes: Bytes, modified_time: SystemTime) {
        let entry = CacheEntry {
            content: bytes,
            modified_time,
        };
        self.cache.put(filename.to_string(), entry);
    }

    // files above the threshold are always read from disk
    pub fn should_cache(file_size: u64, threshold: u64) -> bool {
        file_size <= threshold
    }

    /// Cached bytes for `filename`, if still fresh. A stale entry is evicted.
    pub fn find(&mut self, filename: &str, current_modified_time: SystemTime) -> Option<Bytes> {
        let fresh = self
            .cache
            .get(filename)
            .map(|entry| entry.modified_time == current_modified_time)?;
        if fresh {
            self.cache.peek(filename).map(|entry| entry.content.clone())
        } else {
            self.cache.pop(filename);
            None
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}
