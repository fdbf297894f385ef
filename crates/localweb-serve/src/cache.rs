//! Directory id cache.
//!
//! Maps a normalized relative directory path (`a`, `a/b`, ...) to the
//! provider id of that directory, so sibling requests in one folder skip
//! re-walking the parent chain. One cache belongs to one folder context and
//! is dropped with it.
//!
//! Only confirmed directories are inserted, never leaf files. The empty key
//! always maps to the base document id. Concurrent inserts of the same
//! prefix from different request threads overwrite each other with the same
//! value.

use dashmap::DashMap;

/// Concurrent relative-path -> directory id map.
#[derive(Debug)]
pub struct DirectoryIdCache {
    entries: DashMap<String, String>,
}

impl DirectoryIdCache {
    /// Create a cache rooted at `base_document_id`.
    pub fn new(base_document_id: &str) -> Self {
        let entries = DashMap::new();
        entries.insert(String::new(), base_document_id.to_string());
        Self { entries }
    }

    /// Id of the folder the cache is rooted at.
    pub fn base_document_id(&self) -> String {
        self.entries
            .get("")
            .map(|id| id.value().clone())
            .unwrap_or_default()
    }

    /// Cached directory id for a prefix.
    pub fn get(&self, prefix: &str) -> Option<String> {
        self.entries.get(prefix).map(|id| id.value().clone())
    }

    /// Record a confirmed directory. The root entry is never replaced.
    pub fn insert(&self, prefix: &str, directory_id: &str) {
        if prefix.is_empty() {
            return;
        }
        self.entries
            .insert(prefix.to_string(), directory_id.to_string());
    }

    /// Check whether `prefix` is cached.
    pub fn contains(&self, prefix: &str) -> bool {
        self.entries.contains_key(prefix)
    }

    /// Number of entries, root included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: the root entry is present from construction.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached prefixes in sorted order, root excluded.
    pub fn prefixes(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|key| !key.is_empty())
            .collect();
        keys.sort();
        keys
    }
}
