// SPDX-License-Identifier: LGPL-3.0-only
//! Notifications emitted by the icon service.

use std::path::PathBuf;
use tokio::sync::broadcast;

use crate::icon::bitmap::IconImage;

/// Events emitted by the background loader.
///
/// Events carry only the path; subscribers that want the bitmap query the
/// service again and get a cache hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconEvent {
    /// An icon was resolved and delivered.
    Loaded {
        /// Path the icon was requested for.
        path: PathBuf,
    },
    /// Extraction failed and the request was dropped.
    Failed {
        /// Path the icon was requested for.
        path: PathBuf,
        /// Error that occurred.
        error: String,
    },
}

/// Opaque identifier of a UI-owned icon destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub u64);

/// A bitmap assignment addressed to a slot, delivered to the slot's owner.
#[derive(Debug, Clone)]
pub struct SlotUpdate {
    /// Destination slot.
    pub slot: SlotId,
    /// Path the icon belongs to.
    pub path: PathBuf,
    /// Bitmap to show.
    pub image: IconImage,
    /// Whether `image` is the shared placeholder.
    pub placeholder: bool,
}

/// Create a new broadcast channel for icon events.
pub fn create_icon_event_channel(capacity: usize) -> broadcast::Sender<IconEvent> {
    broadcast::channel(capacity.max(1)).0
}
