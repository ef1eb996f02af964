// SPDX-License-Identifier: LGPL-3.0-only
//! Error types for the icon system.

use std::path::PathBuf;

/// Errors that can occur in the icon system.
#[derive(Debug, thiserror::Error)]
pub enum IconError {
    /// The source file does not exist.
    #[error("File '{0}' does not exist")]
    NotFound(PathBuf),

    /// Icon not found.
    #[error("Icon '{0}' not found in theme")]
    IconNotFound(String),

    /// Theme not found.
    #[error("Icon theme '{0}' not found")]
    ThemeNotFound(String),

    /// Error parsing index.theme file.
    #[error("Failed to parse index.theme: {0}")]
    IndexParseError(String),

    /// Invalid image format.
    #[error("Invalid image format: {0}")]
    InvalidFormat(String),

    /// The extraction gateway could not produce an icon for the path.
    #[error("Icon extraction failed for '{path}': {reason}")]
    Extraction {
        /// Path the icon was requested for.
        path: PathBuf,
        /// Gateway-provided reason.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from the file watcher (notify crate).
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// No tokio runtime is available to host the background loader.
    #[error("No tokio runtime available to spawn the icon loader")]
    NoRuntime,

    /// The request was dropped before it could be resolved.
    #[error("Icon request was cancelled before completion")]
    Cancelled,

    /// A blocking extraction task panicked or was aborted.
    #[error("Task execution error: {0}")]
    TaskFailed(String),
}

impl IconError {
    /// Shorthand for an [`IconError::Extraction`] failure.
    pub fn extraction(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Extraction {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
