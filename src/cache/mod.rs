//! In-memory caches keyed by file modification time
//!
//! An entry is only served while the mtime it was stored with still matches
//! the file on disk; a mismatch drops the entry so the caller rebuilds it.

mod lock;

use indexmap::IndexMap;
use lru::LruCache;
use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::SystemTime;

pub(crate) use lock::mutex_lock;

/// A cached value together with the mtime it was derived from
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub mtime: SystemTime,
    pub value: V,
}

/// Get file modification time
pub fn get_mtime(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

/// Insertion-ordered cache that evicts the oldest key.
///
/// Reads only move an entry to the back once the cache is more than 80%
/// full, so a lightly used cache behaves as plain FIFO and avoids reordering.
#[derive(Debug)]
pub struct SummaryCache<V> {
    capacity: usize,
    entries: IndexMap<String, CacheEntry<V>>,
}

impl<V: Clone> SummaryCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Value for `key` if it was stored with this exact `mtime`
    pub fn get(&mut self, key: &str, mtime: SystemTime) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.mtime != mtime {
            self.entries.shift_remove(key);
            return None;
        }
        let value = entry.value.clone();

        if self.entries.len() * 5 > self.capacity * 4 {
            if let Some(index) = self.entries.get_index_of(key) {
                let last = self.entries.len() - 1;
                self.entries.move_index(index, last);
            }
        }

        Some(value)
    }

    pub fn insert(&mut self, key: String, mtime: SystemTime, value: V) {
        if self.capacity == 0 {
            return;
        }
        self.entries.shift_remove(&key);
        while self.entries.len() >= self.capacity {
            self.entries.shift_remove_index(0);
        }
        self.entries.insert(key, CacheEntry { mtime, value });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Strict LRU cache for rendered HTML; capacity zero disables it
#[derive(Debug)]
pub struct HtmlCache<V> {
    entries: Option<LruCache<String, CacheEntry<V>>>,
}

impl<V: Clone> HtmlCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(LruCache::new),
        }
    }

    /// Value for `key` if it was stored with this exact `mtime`
    pub fn get(&mut self, key: &str, mtime: SystemTime) -> Option<V> {
        let cache = self.entries.as_mut()?;
        let fresh = cache.peek(key)?.mtime == mtime;
        if !fresh {
            cache.pop(key);
            return None;
        }
        cache.get(key).map(|entry| entry.value.clone())
    }

    pub fn insert(&mut self, key: String, mtime: SystemTime, value: V) {
        if let Some(cache) = self.entries.as_mut() {
            cache.put(key, CacheEntry { mtime, value });
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map(LruCache::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        if let Some(cache) = self.entries.as_mut() {
            cache.clear();
        }
    }
}
