//! Configuration for the review scheduler.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auto_create: AutoCreateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads `path` if given, otherwise the default config file.
    ///
    /// An explicit path must exist and parse; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => match Self::config_path() {
                Some(p) if p.exists() => Self::from_file(&p),
                _ => Ok(Self::default()),
            },
        }
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;
        let config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("parsing {}: {e}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "study-review")
            .map(|d| d.config_dir().join("config.toml"))
    }

    pub fn db_path(&self) -> PathBuf {
        self.storage.db_path.clone().unwrap_or_else(default_db_path)
    }
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "study-review")
        .map(|d| d.data_dir().join("reviews.sqlite3"))
        .unwrap_or_else(|| PathBuf::from("reviews.sqlite3"))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

/// Which logged questions the auto-create pipeline looks at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoCreateConfig {
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_window_days() -> u32 {
    7
}

fn default_max_entries() -> usize {
    10
}

impl Default for AutoCreateConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            max_entries: default_max_entries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: default_filter() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [auto_create]
            window_days = 14
            "#,
        )
        .unwrap();
        assert_eq!(config.auto_create.window_days, 14);
        assert_eq!(config.auto_create.max_entries, 10);
        assert_eq!(config.logging.filter, "info");
        assert!(config.storage.db_path.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.storage.db_path = Some(dir.path().join("cards.sqlite3"));
        config.logging.filter = "debug".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.db_path(), dir.path().join("cards.sqlite3"));
        assert_eq!(loaded.logging.filter, "debug");
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
