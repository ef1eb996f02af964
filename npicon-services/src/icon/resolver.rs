// SPDX-License-Identifier: LGPL-3.0-only
//! The cache-or-extract step shared by the loader, preload, and sync paths.

use std::path::Path;
use std::sync::Arc;

use crate::icon::bitmap::IconImage;
use crate::icon::cache::{IconCache, MissingFilePolicy};
use crate::icon::error::IconError;
use crate::icon::gateway::{ExtractionGateway, FileStat};

/// Resolves paths to icons through the cache, extracting on a miss.
pub struct Resolver {
    cache: IconCache,
    gateway: Arc<dyn ExtractionGateway>,
    stat: Arc<dyn FileStat>,
    policy: MissingFilePolicy,
}

impl Resolver {
    pub(crate) fn new(
        cache: IconCache,
        gateway: Arc<dyn ExtractionGateway>,
        stat: Arc<dyn FileStat>,
        policy: MissingFilePolicy,
    ) -> Self {
        Self {
            cache,
            gateway,
            stat,
            policy,
        }
    }

    /// The underlying cache.
    pub fn cache(&self) -> &IconCache {
        &self.cache
    }

    /// Cached icon for `path` if present and still fresh.
    pub fn cached(&self, path: &Path) -> Option<IconImage> {
        let key = self.cache.key(path);
        self.cache.fresh(&key, self.stat.modified(path), self.policy)
    }

    /// Return the fresh cached icon, or extract, cache, and return a new one.
    ///
    /// Blocks on the extraction gateway.
    pub fn resolve(&self, path: &Path, size: u32) -> Result<IconImage, IconError> {
        let key = self.cache.key(path);
        let modified = self.stat.modified(path);

        if let Some(image) = self.cache.fresh(&key, modified, self.policy) {
            log::trace!("Resolver: Cache hit for {:?}", path);
            return Ok(image);
        }

        log::debug!("Resolver: Extracting icon for {:?} at size {}", path, size);
        let image = self.gateway.extract(path, size)?;
        self.cache.put(key, image.clone(), modified);
        Ok(image)
    }

    /// Synchronous resolution for callers that cannot wait for the loader.
    ///
    /// Failures are logged and reported as `None`.
    pub fn resolve_or_log(&self, path: &Path, size: u32) -> Option<IconImage> {
        match self.resolve(path, size) {
            Ok(image) => Some(image),
            Err(e) => {
                log::warn!("Failed to resolve icon for {:?}: {}", path, e);
                None
            },
        }
    }
}
