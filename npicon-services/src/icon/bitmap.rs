// SPDX-License-Identifier: LGPL-3.0-only
//! Immutable, shareable icon bitmaps.

use std::fmt;
use std::sync::Arc;

use image::RgbaImage;

/// Decoded icon bitmap.
///
/// The pixel buffer sits behind an [`Arc`], so cloning an `IconImage` is cheap
/// and every clone points at the same bytes. Once built, an image is never
/// mutated, which is what lets the cache hand the same bitmap to any number
/// of threads.
#[derive(Clone)]
pub struct IconImage {
    /// Raw RGBA pixel data.
    data: Arc<Vec<u8>>,
    /// Image width in pixels.
    width: u32,
    /// Image height in pixels.
    height: u32,
}

impl IconImage {
    /// Wrap raw RGBA8 pixels.
    ///
    /// Returns `None` when `data` is not exactly `width * height * 4` bytes.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        if data.len() != expected {
            return None;
        }
        Some(Self {
            data: Arc::new(data),
            width,
            height,
        })
    }

    /// Build an icon from a decoded `image` buffer.
    pub fn from_rgba(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: Arc::new(image.into_raw()),
            width,
            height,
        }
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA pixel data.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Shared handle to the pixel buffer, for renderers that keep their own reference.
    pub fn shared_pixels(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.data)
    }

    /// Whether two images share the same pixel buffer.
    pub fn ptr_eq(&self, other: &IconImage) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for IconImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IconImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}
