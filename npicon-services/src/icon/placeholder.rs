// SPDX-License-Identifier: LGPL-3.0-only
//! Shared placeholder shown while an icon is being resolved.

use image::{Rgba, RgbaImage};
use once_cell::sync::OnceCell;

use crate::icon::bitmap::IconImage;

/// Edge length of the placeholder bitmap.
pub const PLACEHOLDER_SIZE: u32 = 48;

const FILL: Rgba<u8> = Rgba([0xd8, 0xd8, 0xdc, 0xff]);
const BORDER: Rgba<u8> = Rgba([0x9a, 0x9a, 0xa2, 0xff]);
const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Lazily built, immutable placeholder icon.
#[derive(Default)]
pub struct Placeholder {
    image: OnceCell<IconImage>,
}

impl Placeholder {
    /// Create a provider; the bitmap is drawn on first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// The placeholder image. Every call returns the same shared buffer.
    pub fn get(&self) -> IconImage {
        self.image.get_or_init(draw).clone()
    }
}

/// A plain page with a folded corner.
fn draw() -> IconImage {
    let size = PLACEHOLDER_SIZE;
    let margin = size / 8;
    let fold = size / 4;
    let (left, right) = (margin, size - margin - 1);
    let (top, bottom) = (margin / 2, size - margin / 2 - 1);

    let image = RgbaImage::from_fn(size, size, |x, y| {
        if x < left || x > right || y < top || y > bottom {
            return CLEAR;
        }
        // Distance into the top-right corner; beyond the diagonal is cut away.
        let dx = x - left;
        let dy = y - top;
        let width = right - left;
        let corner = (width - dx) + dy;
        if corner < fold {
            return CLEAR;
        }
        if corner == fold || x == left || x == right || y == top || y == bottom {
            BORDER
        } else {
            FILL
        }
    });

    log::debug!("Placeholder: Built {}x{} placeholder icon", size, size);
    IconImage::from_rgba(image)
}
