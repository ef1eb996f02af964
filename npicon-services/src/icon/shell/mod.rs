// SPDX-License-Identifier: LGPL-3.0-only
//! Shell-style icon extraction for freedesktop systems.
//!
//! A path is mapped to candidate icon names from its MIME type (or `folder`
//! for directories), the names are looked up in the configured XDG icon
//! theme and its parents, and the first hit is decoded and scaled to the
//! requested size.

pub mod lookup;
pub mod mime;
pub mod theme;

use std::fs;
use std::path::Path;

use image::imageops::FilterType;

use crate::icon::bitmap::IconImage;
use crate::icon::error::IconError;
use crate::icon::gateway::ExtractionGateway;
use crate::icon::queue::MAX_ICON_SIZE;

pub use lookup::IconLookup;
pub use theme::{DirectoryType, IconContext, IconDirectory, IconTheme};

/// [`ExtractionGateway`] resolving files through an XDG icon theme.
pub struct ShellIconGateway {
    theme: String,
    lookup: IconLookup,
}

impl ShellIconGateway {
    /// Gateway over the standard icon search paths.
    pub fn new(theme: impl Into<String>) -> Self {
        Self::with_lookup(theme, IconLookup::new())
    }

    /// Gateway over a custom lookup.
    pub fn with_lookup(theme: impl Into<String>, lookup: IconLookup) -> Self {
        Self {
            theme: theme.into(),
            lookup,
        }
    }

    /// Current theme name.
    pub fn theme(&self) -> &str {
        &self.theme
    }

    fn load(&self, icon_path: &Path, size: u32) -> Result<IconImage, IconError> {
        let bytes = fs::read(icon_path)?;
        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| IconError::InvalidFormat(format!("{:?}: {}", icon_path, e)))?;

        let rgba = if size > 0 && (decoded.width() != size || decoded.height() != size) {
            image::imageops::resize(&decoded.to_rgba8(), size, size, FilterType::Triangle)
        } else {
            decoded.to_rgba8()
        };

        Ok(IconImage::from_rgba(rgba))
    }
}

impl ExtractionGateway for ShellIconGateway {
    fn extract(&self, path: &Path, size: u32) -> Result<IconImage, IconError> {
        if size > MAX_ICON_SIZE {
            return Err(IconError::extraction(
                path,
                format!("size {} exceeds the {} pixel limit", size, MAX_ICON_SIZE),
            ));
        }

        let metadata = fs::metadata(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IconError::NotFound(path.to_path_buf())
            } else {
                IconError::IoError(e)
            }
        })?;

        let names = mime::icon_names_for_path(path, metadata.is_dir());
        for name in &names {
            let Some(icon_path) = self.lookup.lookup_icon(name, size, &self.theme) else {
                continue;
            };
            match self.load(&icon_path, size) {
                Ok(image) => return Ok(image),
                Err(e) => log::debug!("ShellIconGateway: Unusable icon {:?}: {}", icon_path, e),
            }
        }

        Err(IconError::IconNotFound(names.join(", ")))
    }
}
