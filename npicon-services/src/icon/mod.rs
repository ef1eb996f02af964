// SPDX-License-Identifier: LGPL-3.0-only
//! Asynchronous icon resolution and caching.
//!
//! [`IconService`] turns filesystem paths into [`IconImage`]s without
//! blocking the caller. Cache hits are answered immediately; misses hand
//! out a shared placeholder and queue the path for a background loader that
//! extracts icons in throttled batches through an [`ExtractionGateway`].
//!
//! ```no_run
//! use npicon_services::icon::{IconService, SlotId, SlotUpdate};
//! use npicon_services::settings::IconSettings;
//! use tokio::sync::mpsc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let (tx, mut rx) = mpsc::unbounded_channel::<SlotUpdate>();
//! let service = IconService::shell_builder(IconSettings::default())
//!     .slot_sink(tx)
//!     .build();
//! service.start()?;
//!
//! service.request_icon("/etc/hosts", SlotId(1));
//! while let Some(update) = rx.recv().await {
//!     // Assign `update.image` to `update.slot` on the UI thread.
//!     if !update.placeholder {
//!         break;
//!     }
//! }
//! service.stop().await;
//! # Ok(())
//! # }
//! ```

mod bitmap;
mod cache;
mod error;
mod events;
mod gateway;
mod loader;
mod placeholder;
mod preload;
mod queue;
mod resolver;
pub mod shell;
mod watcher;

pub use bitmap::IconImage;
pub use cache::{CacheEntry, CacheKey, IconCache, MissingFilePolicy};
pub use error::IconError;
pub use events::{IconEvent, SlotId, SlotUpdate};
pub use gateway::{ExtractionGateway, FileStat, FsStat, SlotSink};
pub use loader::LoaderState;
pub use placeholder::{Placeholder, PLACEHOLDER_SIZE};
pub use preload::PreloadReport;
pub use queue::{
    IconCallback, IconRequest, LoadRequest, LoadTarget, RequestQueue, DEFAULT_ICON_SIZE,
    MAX_ICON_SIZE,
};
pub use resolver::Resolver;
pub use shell::ShellIconGateway;
pub use watcher::IconWatcher;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, oneshot};

use crate::settings::IconSettings;
use loader::BackgroundLoader;

/// Snapshot of service counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IconStats {
    /// Icons in the cache.
    pub cached: usize,
    /// Requests waiting for the background loader.
    pub queued: usize,
    /// Non-empty batches the loader has started.
    pub batches: u64,
}

/// State shared between the service handle, the worker, preload tasks, and watchers.
pub(crate) struct ServiceState {
    pub(crate) settings: IconSettings,
    pub(crate) resolver: Resolver,
    pub(crate) queue: RequestQueue,
    pub(crate) placeholder: Placeholder,
    pub(crate) sink: Option<Arc<dyn SlotSink>>,
    pub(crate) events: broadcast::Sender<IconEvent>,
    pub(crate) batches: AtomicU64,
}

/// Builder for [`IconService`].
pub struct IconServiceBuilder {
    gateway: Arc<dyn ExtractionGateway>,
    settings: IconSettings,
    stat: Arc<dyn FileStat>,
    sink: Option<Arc<dyn SlotSink>>,
}

impl IconServiceBuilder {
    /// Replace the settings.
    pub fn settings(mut self, settings: IconSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the source of file modification times (defaults to [`FsStat`]).
    pub fn file_stat(mut self, stat: impl FileStat + 'static) -> Self {
        self.stat = Arc::new(stat);
        self
    }

    /// Where slot updates go. Without a sink, slot requests are ignored.
    pub fn slot_sink(mut self, sink: impl SlotSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Build the service. The background loader starts out stopped.
    pub fn build(self) -> IconService {
        let cache = IconCache::new(self.settings.cache.case_insensitive_keys);
        let resolver = Resolver::new(
            cache,
            self.gateway,
            self.stat,
            self.settings.cache.missing_file_policy,
        );
        let events = events::create_icon_event_channel(self.settings.loader.event_capacity);

        IconService {
            state: Arc::new(ServiceState {
                settings: self.settings,
                resolver,
                queue: RequestQueue::new(),
                placeholder: Placeholder::new(),
                sink: self.sink,
                events,
                batches: AtomicU64::new(0),
            }),
            loader: BackgroundLoader::default(),
        }
    }
}

/// Owned icon resolution service.
///
/// Dropping the service cancels its background loader.
pub struct IconService {
    state: Arc<ServiceState>,
    loader: BackgroundLoader,
}

impl IconService {
    /// Start building a service around an extraction gateway.
    pub fn builder(gateway: impl ExtractionGateway + 'static) -> IconServiceBuilder {
        IconServiceBuilder {
            gateway: Arc::new(gateway),
            settings: IconSettings::default(),
            stat: Arc::new(FsStat),
            sink: None,
        }
    }

    /// Builder preloaded with a [`ShellIconGateway`] for the configured theme.
    pub fn shell_builder(settings: IconSettings) -> IconServiceBuilder {
        let gateway = ShellIconGateway::new(settings.theme.name.clone());
        Self::builder(gateway).settings(settings)
    }

    /// Request an icon for a UI slot.
    ///
    /// On a cache hit the icon is sent to the slot right away. On a miss the
    /// placeholder is sent before this returns and the path is queued; the
    /// real icon follows once the background loader resolves it. Empty paths
    /// and services without a slot sink are ignored.
    pub fn request_icon(&self, request: impl Into<IconRequest>, slot: SlotId) {
        let request = request.into();
        if request.path.as_os_str().is_empty() {
            log::debug!("IconService: Ignoring empty path for {:?}", slot);
            return;
        }
        let Some(sink) = &self.state.sink else {
            log::debug!("IconService: No slot sink configured, ignoring {:?}", slot);
            return;
        };

        if let Some(image) = self.state.resolver.cached(&request.path) {
            sink.deliver(SlotUpdate {
                slot,
                path: request.path,
                image,
                placeholder: false,
            });
            return;
        }

        sink.deliver(SlotUpdate {
            slot,
            path: request.path.clone(),
            image: self.state.placeholder.get(),
            placeholder: true,
        });
        self.state.queue.push(LoadRequest::new(request, LoadTarget::Slot(slot)));
    }

    /// Request an icon and receive it through a callback.
    ///
    /// The callback runs at most once with the resolved icon: immediately on
    /// the calling thread for a cache hit, otherwise on the loader. It is
    /// never called with the placeholder, nor on failure.
    pub fn request_icon_with<F>(&self, request: impl Into<IconRequest>, callback: F)
    where
        F: FnOnce(IconImage) + Send + 'static,
    {
        let request = request.into();
        if request.path.as_os_str().is_empty() {
            return;
        }

        match self.state.resolver.cached(&request.path) {
            Some(image) => callback(image),
            None => self
                .state
                .queue
                .push(LoadRequest::new(request, LoadTarget::Callback(Box::new(callback)))),
        }
    }

    /// Queue a path for background resolution without any destination.
    pub fn enqueue(&self, request: impl Into<IconRequest>) {
        let request = request.into();
        if request.path.as_os_str().is_empty() {
            return;
        }
        self.state.queue.push(LoadRequest::new(request, LoadTarget::None));
    }

    /// Resolve an icon through the background loader and wait for it.
    ///
    /// Resolves immediately on a cache hit. Requires a running loader to
    /// make progress on a miss.
    pub async fn load_icon(&self, request: impl Into<IconRequest>) -> Result<IconImage, IconError> {
        let request = request.into();
        if request.path.as_os_str().is_empty() {
            return Err(IconError::NotFound(request.path));
        }
        if let Some(image) = self.state.resolver.cached(&request.path) {
            return Ok(image);
        }

        let (tx, rx) = oneshot::channel();
        self.state.queue.push(LoadRequest::new(request, LoadTarget::Completion(tx)));
        rx.await.unwrap_or(Err(IconError::Cancelled))
    }

    /// Resolve an icon on the calling thread, blocking on extraction.
    pub fn get_icon_sync(&self, request: impl Into<IconRequest>) -> Option<IconImage> {
        let request = request.into();
        if request.path.as_os_str().is_empty() {
            return None;
        }
        self.state.resolver.resolve_or_log(&request.path, request.size)
    }

    /// Warm the cache for many paths at once and wait until every extraction
    /// has finished, successfully or not.
    pub async fn preload_icons<I, P>(&self, paths: I, size: u32) -> PreloadReport
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        preload::preload_icons(&self.state, paths, size).await
    }

    /// Drop every cached icon.
    pub fn clear_cache(&self) {
        self.state.resolver.cache().clear();
        log::debug!("IconService: Cache cleared");
    }

    /// Drop the cached icon for one path. Returns whether there was one.
    pub fn invalidate(&self, path: impl AsRef<Path>) -> bool {
        self.state.resolver.cache().invalidate(path.as_ref())
    }

    /// The cache, for inspection.
    pub fn cache(&self) -> &IconCache {
        self.state.resolver.cache()
    }

    /// Current counters.
    pub fn stats(&self) -> IconStats {
        IconStats {
            cached: self.state.resolver.cache().len(),
            queued: self.state.queue.len(),
            batches: self.state.batches.load(Ordering::Relaxed),
        }
    }

    /// The shared placeholder icon.
    pub fn placeholder(&self) -> IconImage {
        self.state.placeholder.get()
    }

    /// Subscribe to loader events.
    pub fn subscribe(&self) -> broadcast::Receiver<IconEvent> {
        self.state.events.subscribe()
    }

    /// Settings the service was built with.
    pub fn settings(&self) -> &IconSettings {
        &self.state.settings
    }

    /// Start the background loader on the current tokio runtime.
    pub fn start(&self) -> Result<(), IconError> {
        self.loader.start(&self.state)
    }

    /// Stop the background loader.
    ///
    /// Waits at most `loader.shutdown_grace_ms`; afterwards the loader is
    /// reported stopped even if the worker is still finishing an extraction.
    /// Queued requests stay queued for the next `start`.
    pub async fn stop(&self) {
        self.loader.stop(self.state.settings.loader.shutdown_grace()).await;
    }

    /// Whether the background loader is running.
    pub fn state(&self) -> LoaderState {
        self.loader.state()
    }

    /// Create a watcher that invalidates cached icons of changed files.
    pub fn watcher(&self) -> Result<IconWatcher, IconError> {
        IconWatcher::new(Arc::downgrade(&self.state))
    }

    /// Watch one file or directory.
    pub fn watch(&self, path: impl AsRef<Path>) -> Result<IconWatcher, IconError> {
        let mut watcher = self.watcher()?;
        watcher.watch(path.as_ref())?;
        Ok(watcher)
    }
}
