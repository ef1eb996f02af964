// SPDX-License-Identifier: LGPL-3.0-only
//! XDG icon theme index parsing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::icon::error::IconError;

/// Icon context (directory type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconContext {
    /// Actions context.
    Actions,
    /// Applications context.
    Apps,
    /// Devices context.
    Devices,
    /// MIME types context.
    Mimetypes,
    /// Places context.
    Places,
    /// Status context.
    Status,
    /// Anything else.
    Unknown,
}

impl IconContext {
    /// Parse the `Context=` value of a theme directory.
    pub fn parse(s: &str) -> Self {
        match s {
            "Actions" => Self::Actions,
            "Applications" | "Apps" => Self::Apps,
            "Devices" => Self::Devices,
            "MimeTypes" | "Mimetypes" => Self::Mimetypes,
            "Places" => Self::Places,
            "Status" => Self::Status,
            _ => Self::Unknown,
        }
    }

    /// Context an icon name most likely lives in.
    pub fn guess(icon_name: &str) -> Self {
        if icon_name.starts_with("folder") || icon_name.starts_with("user-") {
            Self::Places
        } else if icon_name.starts_with("drive-") || icon_name.starts_with("media-") {
            Self::Devices
        } else if icon_name.starts_with("application-x-executable") {
            Self::Apps
        } else if icon_name.contains('-') {
            Self::Mimetypes
        } else {
            Self::Unknown
        }
    }
}

/// Directory type for icon directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryType {
    /// Fixed size directory.
    Fixed,
    /// Scalable directory.
    Scalable,
    /// Threshold directory.
    Threshold,
}

impl DirectoryType {
    fn parse(s: &str) -> Self {
        match s {
            "Scalable" => Self::Scalable,
            "Threshold" => Self::Threshold,
            _ => Self::Fixed,
        }
    }
}

/// One `[directory]` section of an `index.theme`.
#[derive(Debug, Clone)]
pub struct IconDirectory {
    /// Directory name relative to the theme root.
    pub name: String,
    /// Nominal icon size.
    pub size: u32,
    /// Context of icons.
    pub context: IconContext,
    /// Directory type.
    pub directory_type: DirectoryType,
    /// Minimum size (for scalable).
    pub min_size: u32,
    /// Maximum size (for scalable).
    pub max_size: u32,
    /// Threshold (for threshold directories).
    pub threshold: u32,
}

impl IconDirectory {
    /// How badly this directory fits a requested size; 0 is a perfect fit.
    ///
    /// Larger icons (which get scaled down) are preferred over smaller ones
    /// (which get scaled up and blur).
    pub fn size_distance(&self, size: u32) -> u64 {
        const UPSCALE_PENALTY: u64 = 10_000;

        let (fits, nominal) = match self.directory_type {
            DirectoryType::Fixed => (self.size == size, self.size),
            DirectoryType::Scalable => (
                (self.min_size..=self.max_size).contains(&size),
                self.size,
            ),
            DirectoryType::Threshold => (self.size.abs_diff(size) <= self.threshold, self.size),
        };

        if fits {
            0
        } else if nominal >= size {
            u64::from(nominal - size)
        } else {
            u64::from(size - nominal) + UPSCALE_PENALTY
        }
    }
}

/// A parsed icon theme.
#[derive(Debug, Clone)]
pub struct IconTheme {
    /// Theme name.
    pub name: String,
    /// Inherited themes (fallback chain).
    pub inherits: Vec<String>,
    /// Directories in this theme.
    pub directories: Vec<IconDirectory>,
    /// Theme roots; a theme may be spread over several base directories.
    pub roots: Vec<PathBuf>,
}

impl IconTheme {
    /// Load a theme from the `index.theme` in `root`.
    pub fn load(theme_name: &str, root: PathBuf) -> Result<Self, IconError> {
        let index_path = root.join("index.theme");
        let content = std::fs::read_to_string(&index_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IconError::ThemeNotFound(theme_name.to_string())
            } else {
                IconError::IndexParseError(format!("Failed to read {:?}: {}", index_path, e))
            }
        })?;
        Self::parse(theme_name, &content, root)
    }

    /// Parse the contents of an `index.theme`.
    pub fn parse(theme_name: &str, content: &str, root: PathBuf) -> Result<Self, IconError> {
        let ini = parse_ini(content);

        let theme_section = ini
            .get("Icon Theme")
            .ok_or_else(|| IconError::IndexParseError("Missing [Icon Theme] section".to_string()))?;

        let name = theme_section
            .get("Name")
            .cloned()
            .unwrap_or_else(|| theme_name.to_string());

        let inherits = theme_section
            .get("Inherits")
            .map(|s| list(s).collect())
            .unwrap_or_default();

        let directory_names = theme_section
            .get("Directories")
            .ok_or_else(|| IconError::IndexParseError("Missing Directories key".to_string()))?;

        let directories = list(directory_names)
            .filter_map(|dir_name| {
                let section = ini.get(dir_name.as_str())?;
                let number = |key: &str| section.get(key).and_then(|s| s.parse::<u32>().ok());
                let size = number("Size").unwrap_or(48);

                Some(IconDirectory {
                    size,
                    context: IconContext::parse(section.get("Context").map(String::as_str).unwrap_or("")),
                    directory_type: DirectoryType::parse(
                        section.get("Type").map(String::as_str).unwrap_or("Threshold"),
                    ),
                    min_size: number("MinSize").unwrap_or(size),
                    max_size: number("MaxSize").unwrap_or(size),
                    threshold: number("Threshold").unwrap_or(2),
                    name: dir_name,
                })
            })
            .collect();

        Ok(Self {
            name,
            inherits,
            directories,
            roots: vec![root],
        })
    }

    /// Candidate locations of a directory across all roots.
    pub fn directory_paths<'a>(&'a self, dir_name: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
        self.roots.iter().map(move |root| root.join(dir_name))
    }

    pub(crate) fn add_root(&mut self, root: &Path) {
        if !self.roots.iter().any(|r| r == root) {
            self.roots.push(root.to_path_buf());
        }
    }
}

fn list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Minimal INI reader for index.theme files.
fn parse_ini(content: &str) -> HashMap<String, HashMap<String, String>> {
    let mut result: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            current = Some(section.to_string());
            result.entry(section.to_string()).or_default();
            continue;
        }

        if let (Some(section), Some((key, value))) = (current.as_ref(), line.split_once('=')) {
            result
                .entry(section.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = "\
[Icon Theme]
Name=Test
Inherits=hicolor, Adwaita
Directories=16x16/mimetypes,48x48/mimetypes,scalable/places

# comment
[16x16/mimetypes]
Size=16
Context=MimeTypes
Type=Fixed

[48x48/mimetypes]
Size=48
Context=MimeTypes
Type=Fixed

[scalable/places]
Size=64
MinSize=8
MaxSize=512
Context=Places
Type=Scalable
";

    #[test]
    fn parses_index_theme() {
        let theme = IconTheme::parse("test", INDEX, PathBuf::from("/themes/test")).unwrap();
        assert_eq!(theme.name, "Test");
        assert_eq!(theme.inherits, vec!["hicolor", "Adwaita"]);
        assert_eq!(theme.directories.len(), 3);

        let places = &theme.directories[2];
        assert_eq!(places.context, IconContext::Places);
        assert_eq!(places.directory_type, DirectoryType::Scalable);
        assert_eq!(places.max_size, 512);
    }

    #[test]
    fn missing_theme_section_is_an_error() {
        let err = IconTheme::parse("x", "[Other]\nA=b", PathBuf::new()).unwrap_err();
        assert!(matches!(err, IconError::IndexParseError(_)));
    }

    #[test]
    fn size_distance_prefers_downscaling() {
        let theme = IconTheme::parse("test", INDEX, PathBuf::new()).unwrap();
        let small = &theme.directories[0];
        let large = &theme.directories[1];

        assert_eq!(large.size_distance(48), 0);
        assert!(large.size_distance(32) < small.size_distance(32));
        assert_eq!(theme.directories[2].size_distance(100), 0);
    }

    #[test]
    fn guesses_contexts() {
        assert_eq!(IconContext::guess("folder"), IconContext::Places);
        assert_eq!(IconContext::guess("drive-harddisk"), IconContext::Devices);
        assert_eq!(IconContext::guess("text-x-generic"), IconContext::Mimetypes);
        assert_eq!(IconContext::guess("unknown"), IconContext::Unknown);
    }
}
