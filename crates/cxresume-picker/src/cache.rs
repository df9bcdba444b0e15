//! In-memory per-session caches.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

/// Path-keyed cache.
///
/// Lives as long as the picker that owns it; nothing is persisted. A poisoned
/// lock is recovered since entries are written whole.
#[derive(Debug)]
pub struct MemoryCache<V> {
    entries: RwLock<HashMap<PathBuf, V>>,
}

impl<V: Clone> MemoryCache<V> {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn get(&self, path: &Path) -> Option<V> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path)
    }

    pub fn insert(&self, path: impl Into<PathBuf>, value: V) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), value);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_overwrites_and_reads_back() {
        let cache = MemoryCache::new();
        assert!(cache.is_empty());
        cache.insert("/a.jsonl", 1);
        cache.insert(PathBuf::from("/a.jsonl"), 2);
        cache.insert("/b.jsonl", 3);
        assert_eq!(cache.get(Path::new("/a.jsonl")), Some(2));
        assert!(cache.contains(Path::new("/b.jsonl")));
        assert!(!cache.contains(Path::new("/c.jsonl")));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn instances_do_not_share_entries() {
        let a = MemoryCache::new();
        let b: MemoryCache<u8> = MemoryCache::new();
        a.insert("/x", 1u8);
        assert!(b.get(Path::new("/x")).is_none());
    }
}
