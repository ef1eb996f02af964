// SPDX-License-Identifier: LGPL-3.0-only
//! Process-lifetime icon cache keyed by normalized path.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use serde::Deserialize;

use crate::icon::bitmap::IconImage;

/// What a cache lookup does when the source file can no longer be stat'ed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingFilePolicy {
    /// Return the cached entry unverified.
    #[default]
    Trust,
    /// Drop the cached entry and report a miss.
    Evict,
}

/// Normalized cache key for a path.
///
/// Relative paths are resolved against the current directory and `.`/`..`
/// components are folded lexically, without touching the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(PathBuf);

impl CacheKey {
    /// Build the key for `path`.
    pub fn new(path: &Path, case_insensitive: bool) -> Self {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("/"))
                .join(path)
        };

        let mut normalized = PathBuf::new();
        for component in absolute.components() {
            match component {
                Component::CurDir => {},
                Component::ParentDir => {
                    normalized.pop();
                },
                other => normalized.push(other.as_os_str()),
            }
        }

        if case_insensitive {
            normalized = PathBuf::from(normalized.to_string_lossy().to_lowercase());
        }

        Self(normalized)
    }

    /// The normalized path.
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

/// A cached icon and the source file's modification time at extraction.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The extracted icon.
    pub image: IconImage,
    /// Modification time observed just before extraction.
    pub last_write: Option<SystemTime>,
}

/// Concurrent map from normalized path to [`CacheEntry`].
///
/// Entries are replaced whole, so a poisoned lock never exposes a
/// half-written entry and is simply recovered.
pub struct IconCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    case_insensitive: bool,
}

impl IconCache {
    /// Create an empty cache.
    pub fn new(case_insensitive: bool) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            case_insensitive,
        }
    }

    /// Normalize `path` into this cache's key space.
    pub fn key(&self, path: &Path) -> CacheKey {
        CacheKey::new(path, self.case_insensitive)
    }

    /// Get the entry for a path, regardless of freshness.
    pub fn lookup(&self, path: &Path) -> Option<CacheEntry> {
        self.get(&self.key(path))
    }

    /// Store an icon for a path, replacing any previous entry.
    pub fn insert(&self, path: &Path, image: IconImage, last_write: Option<SystemTime>) {
        self.put(self.key(path), image, last_write);
    }

    pub(crate) fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    pub(crate) fn put(&self, key: CacheKey, image: IconImage, last_write: Option<SystemTime>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, CacheEntry { image, last_write });
    }

    /// Return the cached image if it is still valid for a file whose current
    /// modification time is `current`.
    ///
    /// `current == None` means the file is missing or could not be stat'ed,
    /// in which case `policy` decides.
    pub fn fresh(
        &self,
        key: &CacheKey,
        current: Option<SystemTime>,
        policy: MissingFilePolicy,
    ) -> Option<IconImage> {
        let entry = self.get(key)?;

        match current {
            None => match policy {
                MissingFilePolicy::Trust => Some(entry.image),
                MissingFilePolicy::Evict => {
                    if self.evict_if_unchanged(key, &entry.image) {
                        log::debug!("IconCache: Evicted entry for missing file {:?}", key.as_path());
                    }
                    None
                },
            },
            Some(modified) if entry.last_write == Some(modified) => Some(entry.image),
            Some(_) => {
                log::debug!("IconCache: Stale entry for {:?}", key.as_path());
                None
            },
        }
    }

    /// Remove the entry for a path. Returns whether one existed.
    pub fn invalidate(&self, path: &Path) -> bool {
        self.remove(&self.key(path))
    }

    /// Remove the entry for `key` only if it still holds `inspected`.
    ///
    /// Check and removal share one write guard, so an entry replaced by
    /// another thread after the read survives.
    fn evict_if_unchanged(&self, key: &CacheKey, inspected: &IconImage) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some(current) if current.image.ptr_eq(inspected) => entries.remove(key).is_some(),
            _ => false,
        }
    }

    fn remove(&self, key: &CacheKey) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key).is_some()
    }

    /// Check if a path has an entry.
    pub fn contains(&self, path: &Path) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(&self.key(path))
    }

    /// Number of cached icons.
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
    }
}

impl Default for IconCache {
    fn default() -> Self {
        Self::new(false)
    }
}
