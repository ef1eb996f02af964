// SPDX-License-Identifier: LGPL-3.0-only
//! Icon lookup across theme search paths with inheritance.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::icon::error::IconError;
use crate::icon::shell::theme::{IconContext, IconTheme};

/// Raster formats the gateway can decode. SVG and XPM are left to callers
/// that bring their own decoder.
const EXTENSIONS: [&str; 1] = ["png"];

/// Theme every lookup falls back to.
const FALLBACK_THEME: &str = "hicolor";

/// Finds icon files by name in XDG icon themes.
pub struct IconLookup {
    /// Parsed themes, `None` for themes known to be missing.
    themes: Mutex<HashMap<String, Option<IconTheme>>>,
    /// Base directories holding theme folders.
    search_paths: Vec<PathBuf>,
}

impl IconLookup {
    /// Lookup over the standard XDG search paths.
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        if let Some(home) = dirs::home_dir() {
            search_paths.push(home.join(".icons"));
        }
        if let Some(data) = dirs::data_dir() {
            search_paths.push(data.join("icons"));
        }
        search_paths.push(PathBuf::from("/usr/local/share/icons"));
        search_paths.push(PathBuf::from("/usr/share/icons"));
        search_paths.push(PathBuf::from("/usr/share/pixmaps"));

        Self::with_search_paths(search_paths)
    }

    /// Lookup over explicit base directories, searched in order.
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self {
            themes: Mutex::new(HashMap::new()),
            search_paths,
        }
    }

    /// Load a theme, merging every base directory that carries it.
    pub fn load_theme(&self, theme_name: &str) -> Result<IconTheme, IconError> {
        let mut themes = self.themes.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(cached) = themes.get(theme_name) {
            return cached
                .clone()
                .ok_or_else(|| IconError::ThemeNotFound(theme_name.to_string()));
        }

        let mut loaded: Option<IconTheme> = None;
        for base in &self.search_paths {
            let root = base.join(theme_name);
            if !root.is_dir() {
                continue;
            }
            match loaded.as_mut() {
                Some(theme) => theme.add_root(&root),
                None => match IconTheme::load(theme_name, root) {
                    Ok(theme) => loaded = Some(theme),
                    Err(e) => log::debug!("IconLookup: Skipping {:?}: {}", base, e),
                },
            }
        }

        themes.insert(theme_name.to_string(), loaded.clone());
        loaded.ok_or_else(|| IconError::ThemeNotFound(theme_name.to_string()))
    }

    /// Find the file for `icon_name` in `theme_name`, its parents, hicolor,
    /// and finally the bare search paths (pixmaps style).
    pub fn lookup_icon(&self, icon_name: &str, size: u32, theme_name: &str) -> Option<PathBuf> {
        let context = IconContext::guess(icon_name);
        let mut visited = HashSet::new();
        let mut pending = vec![theme_name.to_string()];

        while let Some(name) = pending.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }
            let Ok(theme) = self.load_theme(&name) else {
                continue;
            };
            if let Some(path) = self.lookup_in_theme(&theme, icon_name, size, context) {
                log::debug!("IconLookup: Found '{}' in theme '{}' at {:?}", icon_name, name, path);
                return Some(path);
            }
            // Parents are searched in declaration order.
            pending.extend(theme.inherits.iter().rev().cloned());
            if pending.is_empty() && !visited.contains(FALLBACK_THEME) {
                pending.push(FALLBACK_THEME.to_string());
            }
        }

        if !visited.contains(FALLBACK_THEME) {
            if let Ok(theme) = self.load_theme(FALLBACK_THEME) {
                if let Some(path) = self.lookup_in_theme(&theme, icon_name, size, context) {
                    return Some(path);
                }
            }
        }

        self.search_paths
            .iter()
            .find_map(|base| find_file(base, icon_name))
    }

    fn lookup_in_theme(
        &self,
        theme: &IconTheme,
        icon_name: &str,
        size: u32,
        context: IconContext,
    ) -> Option<PathBuf> {
        let mut directories: Vec<_> = theme.directories.iter().collect();
        // Matching context first, then closest size.
        directories.sort_by_key(|dir| (dir.context != context, dir.size_distance(size)));

        directories.into_iter().find_map(|dir| {
            theme
                .directory_paths(&dir.name)
                .find_map(|path| find_file(&path, icon_name))
        })
    }
}

impl Default for IconLookup {
    fn default() -> Self {
        Self::new()
    }
}

fn find_file(dir: &Path, icon_name: &str) -> Option<PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", icon_name, ext)))
        .find(|path| path.is_file())
}
