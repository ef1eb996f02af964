// SPDX-License-Identifier: LGPL-3.0-only
//! Pending icon load requests.

use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;

use crate::icon::bitmap::IconImage;
use crate::icon::error::IconError;
use crate::icon::events::SlotId;

/// Icon size used when a caller does not ask for one.
pub const DEFAULT_ICON_SIZE: u32 = 48;

/// Largest size the shell gateway will render.
pub const MAX_ICON_SIZE: u32 = 1024;

/// The minimal value callers hand to the icon service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconRequest {
    /// File or directory to get an icon for.
    pub path: PathBuf,
    /// Desired icon edge length in pixels.
    pub size: u32,
}

impl IconRequest {
    /// Request the icon for `path` at [`DEFAULT_ICON_SIZE`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            size: DEFAULT_ICON_SIZE,
        }
    }

    /// Set the size hint.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }
}

impl From<PathBuf> for IconRequest {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for IconRequest {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl From<&PathBuf> for IconRequest {
    fn from(path: &PathBuf) -> Self {
        Self::new(path.clone())
    }
}

impl From<&str> for IconRequest {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for IconRequest {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

/// One-shot completion handler for a queued request.
pub type IconCallback = Box<dyn FnOnce(IconImage) + Send + 'static>;

/// Where a resolved icon goes.
pub enum LoadTarget {
    /// Warm the cache only.
    None,
    /// Send a [`SlotUpdate`](crate::icon::SlotUpdate) to the slot owner.
    Slot(SlotId),
    /// Invoke a callback with the resolved image.
    Callback(IconCallback),
    /// Resolve a waiting future.
    Completion(oneshot::Sender<Result<IconImage, IconError>>),
}

impl fmt::Debug for LoadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadTarget::None => f.write_str("None"),
            LoadTarget::Slot(slot) => f.debug_tuple("Slot").field(slot).finish(),
            LoadTarget::Callback(_) => f.write_str("Callback"),
            LoadTarget::Completion(_) => f.write_str("Completion"),
        }
    }
}

/// A request waiting for the background loader.
#[derive(Debug)]
pub struct LoadRequest {
    /// Path to resolve.
    pub path: PathBuf,
    /// Size hint.
    pub size: u32,
    /// Destination of the result.
    pub target: LoadTarget,
}

impl LoadRequest {
    /// Build a request from the boundary value and a destination.
    pub fn new(request: IconRequest, target: LoadTarget) -> Self {
        Self {
            path: request.path,
            size: request.size,
            target,
        }
    }
}

/// FIFO of pending requests, appended from any thread and drained by the loader.
#[derive(Default)]
pub struct RequestQueue {
    pending: Mutex<VecDeque<LoadRequest>>,
}

impl RequestQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request.
    pub fn push(&self, request: LoadRequest) {
        self.lock().push_back(request);
    }

    /// Take up to `max` requests from the front.
    pub fn take_batch(&self, max: usize) -> Vec<LoadRequest> {
        let mut pending = self.lock();
        let count = max.min(pending.len());
        pending.drain(..count).collect()
    }

    /// Put unprocessed requests back at the front, keeping their order.
    pub fn requeue_front(&self, requests: Vec<LoadRequest>) {
        let mut pending = self.lock();
        for request in requests.into_iter().rev() {
            pending.push_front(request);
        }
    }

    /// Number of queued requests.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<LoadRequest>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
