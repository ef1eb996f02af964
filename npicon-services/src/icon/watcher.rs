// SPDX-License-Identifier: LGPL-3.0-only
//! Eager cache invalidation driven by filesystem change notifications.

use std::path::{Path, PathBuf};
use std::sync::Weak;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::icon::ServiceState;
use crate::icon::error::IconError;

/// Watches paths and drops cache entries for files that change.
///
/// Staleness is still checked on every lookup; the watcher only makes
/// the cache forget changed files sooner. Dropping it stops watching.
pub struct IconWatcher {
    watcher: RecommendedWatcher,
}

impl IconWatcher {
    pub(crate) fn new(state: Weak<ServiceState>) -> Result<Self, IconError> {
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let Some(state) = state.upgrade() else {
                    return;
                };
                for path in affected_paths(&event) {
                    if state.resolver.cache().invalidate(path) {
                        log::debug!("IconWatcher: Invalidated {:?}", path);
                    }
                }
            },
            Err(e) => log::warn!("IconWatcher: Watch error: {}", e),
        })?;

        Ok(Self { watcher })
    }

    /// Start watching a file or directory (its direct children only).
    pub fn watch(&mut self, path: &Path) -> Result<(), IconError> {
        self.watcher.watch(path, RecursiveMode::NonRecursive)?;
        Ok(())
    }

    /// Start watching a directory tree.
    pub fn watch_recursive(&mut self, path: &Path) -> Result<(), IconError> {
        self.watcher.watch(path, RecursiveMode::Recursive)?;
        Ok(())
    }

    /// Stop watching a path.
    pub fn unwatch(&mut self, path: &Path) -> Result<(), IconError> {
        self.watcher.unwatch(path)?;
        Ok(())
    }
}

/// Paths whose cached icons an event makes suspect.
///
/// Creation counts too: a path re-created under an old cache entry
/// must not keep the old icon.
fn affected_paths(event: &Event) -> Vec<&PathBuf> {
    match event.kind {
        EventKind::Access(_) => Vec::new(),
        EventKind::Create(_)
        | EventKind::Modify(_)
        | EventKind::Remove(_)
        | EventKind::Any
        | EventKind::Other => event.paths.iter().collect(),
    }
}
