// SPDX-License-Identifier: LGPL-3.0-only
use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use xdg::BaseDirectories;

use crate::icon::MissingFilePolicy;

/// XDG prefix for npicon configuration.
pub const CONFIG_PREFIX: &str = "npicon";
/// Configuration file name looked up under [`CONFIG_PREFIX`].
pub const CONFIG_FILE: &str = "icons.toml";

/// Tuning knobs for the icon service.
///
/// Every field has a default, so a config file only needs the keys it
/// changes:
///
/// ```toml
/// [loader]
/// batch_size = 20
///
/// [cache]
/// missing_file_policy = "evict"
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct IconSettings {
    /// Background loader settings.
    #[serde(default)]
    pub loader: LoaderSettings,
    /// Cache settings.
    #[serde(default)]
    pub cache: CacheSettings,
    /// Preload settings.
    #[serde(default)]
    pub preload: PreloadSettings,
    /// Icon theme used by the shell gateway.
    #[serde(default)]
    pub theme: ThemeSettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoaderSettings {
    /// Requests processed per batch.
    pub batch_size: usize,
    /// Pause after a non-empty batch.
    pub batch_delay_ms: u64,
    /// Pause when the queue was empty.
    pub idle_delay_ms: u64,
    /// How long `stop()` waits for the worker to exit.
    pub shutdown_grace_ms: u64,
    /// Buffer of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_delay_ms: 50,
            idle_delay_ms: 100,
            shutdown_grace_ms: 1000,
            event_capacity: 100,
        }
    }
}

impl LoaderSettings {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheSettings {
    /// Lowercase cache keys so paths differing only in case share an entry.
    pub case_insensitive_keys: bool,
    /// Behaviour when a cached file can no longer be stat'ed.
    pub missing_file_policy: MissingFilePolicy,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            case_insensitive_keys: cfg!(any(windows, target_os = "macos")),
            missing_file_policy: MissingFilePolicy::Trust,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreloadSettings {
    /// Maximum concurrent preload extractions; 0 means unbounded.
    pub concurrency: usize,
}

impl Default for PreloadSettings {
    fn default() -> Self {
        Self { concurrency: 8 }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThemeSettings {
    /// Icon theme name.
    pub name: String,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            name: "hicolor".to_string(),
        }
    }
}

impl IconSettings {
    /// Parse settings from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load settings from standard locations in precedence order.
    ///
    /// Order (later overrides earlier):
    /// 1. System Data: /usr/share/npicon/icons.toml (and XDG_DATA_DIRS)
    /// 2. System Config: /etc/xdg/npicon/icons.toml (and XDG_CONFIG_DIRS)
    /// 3. User Config: ~/.config/npicon/icons.toml (XDG_CONFIG_HOME)
    ///
    /// Files are merged table by table, so a user file that only sets
    /// `loader.batch_size` keeps system values for everything else.
    pub async fn load() -> Result<Self> {
        let xdg_dirs = BaseDirectories::with_prefix(CONFIG_PREFIX)?;
        let mut merged = toml::Table::new();

        for path in xdg_dirs.find_data_files(CONFIG_FILE).rev() {
            Self::merge_file(&mut merged, &path).await;
        }

        for path in xdg_dirs.find_config_files(CONFIG_FILE).rev() {
            Self::merge_file(&mut merged, &path).await;
        }

        let user_config_path = xdg_dirs.get_config_home().join(CONFIG_FILE);
        if user_config_path.exists() {
            Self::merge_file(&mut merged, &user_config_path).await;
        }

        Ok(toml::Value::Table(merged).try_into()?)
    }

    /// Load settings from a single file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        Self::from_toml_str(&content)
    }

    async fn merge_file(merged: &mut toml::Table, path: &Path) {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                log::warn!("Failed to read icon settings {:?}: {}", path, e);
                return;
            },
        };

        match content.parse::<toml::Table>() {
            Ok(table) => {
                log::debug!("Loaded icon settings from {:?}", path);
                merge_tables(merged, table);
            },
            Err(e) => log::warn!("Failed to parse icon settings {:?}: {}", path, e),
        }
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            },
            (_, value) => {
                base.insert(key, value);
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_loader_contract() {
        let settings = IconSettings::default();
        assert_eq!(settings.loader.batch_size, 10);
        assert_eq!(settings.loader.batch_delay(), Duration::from_millis(50));
        assert_eq!(settings.loader.idle_delay(), Duration::from_millis(100));
        assert_eq!(settings.preload.concurrency, 8);
        assert_eq!(settings.theme.name, "hicolor");
        assert_eq!(settings.cache.missing_file_policy, MissingFilePolicy::Trust);
    }

    #[test]
    fn partial_documents_keep_defaults() {
        let settings = IconSettings::from_toml_str(
            r#"
            [loader]
            batch_size = 3

            [cache]
            missing_file_policy = "evict"
            case_insensitive_keys = true
            "#,
        )
        .unwrap();

        assert_eq!(settings.loader.batch_size, 3);
        assert_eq!(settings.loader.batch_delay_ms, 50);
        assert_eq!(settings.cache.missing_file_policy, MissingFilePolicy::Evict);
        assert!(settings.cache.case_insensitive_keys);
        assert_eq!(settings.theme, ThemeSettings::default());
    }

    #[test]
    fn rejects_bad_policy() {
        assert!(IconSettings::from_toml_str("[cache]\nmissing_file_policy = \"maybe\"").is_err());
    }

    #[test]
    fn later_tables_override_earlier_keys() {
        let mut base: toml::Table = "[loader]\nbatch_size = 4\nidle_delay_ms = 7".parse().unwrap();
        let overlay: toml::Table = "[loader]\nbatch_size = 9".parse().unwrap();
        merge_tables(&mut base, overlay);

        let settings: IconSettings = toml::Value::Table(base).try_into().unwrap();
        assert_eq!(settings.loader.batch_size, 9);
        assert_eq!(settings.loader.idle_delay_ms, 7);
    }

    #[tokio::test]
    async fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[preload]\nconcurrency = 2\n[theme]\nname = \"Adwaita\"\n").unwrap();

        let settings = IconSettings::load_from(&path).await.unwrap();
        assert_eq!(settings.preload.concurrency, 2);
        assert_eq!(settings.theme.name, "Adwaita");
    }
}
