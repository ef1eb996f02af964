// SPDX-License-Identifier: LGPL-3.0-only
//! Collaborator seams: icon extraction, file metadata, and slot delivery.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use tokio::sync::mpsc;

use crate::icon::bitmap::IconImage;
use crate::icon::error::IconError;
use crate::icon::events::SlotUpdate;

/// Turns a path into an icon bitmap.
///
/// Implementations are called from the blocking pool and from caller
/// threads at the same time, so they must be safe to invoke concurrently.
pub trait ExtractionGateway: Send + Sync {
    /// Extract the icon for `path` at roughly `size` pixels.
    fn extract(&self, path: &Path, size: u32) -> Result<IconImage, IconError>;
}

impl<F> ExtractionGateway for F
where
    F: Fn(&Path, u32) -> Result<IconImage, IconError> + Send + Sync,
{
    fn extract(&self, path: &Path, size: u32) -> Result<IconImage, IconError> {
        self(path, size)
    }
}

/// Source of file modification times for staleness checks.
pub trait FileStat: Send + Sync {
    /// Current modification time, or `None` if the file is missing or unreadable.
    fn modified(&self, path: &Path) -> Option<SystemTime>;
}

/// [`FileStat`] backed by `std::fs::metadata`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStat;

impl FileStat for FsStat {
    fn modified(&self, path: &Path) -> Option<SystemTime> {
        fs::metadata(path).and_then(|m| m.modified()).ok()
    }
}

/// Hands slot updates to whichever context owns the slots.
///
/// The icon service never touches slot state itself; it only calls
/// `deliver`, which must not block.
pub trait SlotSink: Send + Sync {
    /// Queue `update` for the slot owner.
    fn deliver(&self, update: SlotUpdate);
}

impl SlotSink for mpsc::UnboundedSender<SlotUpdate> {
    fn deliver(&self, update: SlotUpdate) {
        let slot = update.slot;
        if self.send(update).is_err() {
            log::debug!("SlotSink: Receiver dropped, discarding update for {:?}", slot);
        }
    }
}
