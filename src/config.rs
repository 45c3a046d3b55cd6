use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{MsError, Result};

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Directory where milestones and folders are stored
    pub data_dir: PathBuf,

    /// Directory for backups
    pub backup_dir: PathBuf,

    /// Whether to write a per-record backup copy on every save
    pub auto_backup: bool,

    /// Maximum number of full backup archives to keep (0 keeps all)
    pub max_backups: u32,
}

impl Default for Config {
    fn default() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mstone");

        Config {
            data_dir: base.clone(),
            backup_dir: base.join("backups"),
            auto_backup: true,
            max_backups: 10,
        }
    }
}

impl Config {
    /// Platform-specific default location of the config file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mstone")
            .join("config.json")
    }

    /// Loads the configuration at `path`, falling back to defaults when
    /// no file exists yet.
    pub fn load(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| MsError::ConfigError {
            message: format!("Failed to parse {}: {}", path.display(), e),
        })
    }

    /// Writes the configuration to `path`, creating parent directories
    /// as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|_| MsError::DirectoryError {
                path: parent.to_path_buf(),
            })?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Applies a single `key=value` assignment from `config --set`.
    pub fn apply_set(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment.split_once('=').ok_or_else(|| MsError::ConfigError {
            message: format!("Expected key=value, got '{}'", assignment),
        })?;

        match key.trim() {
            "data_dir" => self.data_dir = PathBuf::from(value.trim()),
            "backup_dir" => self.backup_dir = PathBuf::from(value.trim()),
            "auto_backup" => {
                self.auto_backup = value.trim().parse().map_err(|_| MsError::ConfigError {
                    message: format!("auto_backup expects true or false, got '{}'", value),
                })?;
            }
            "max_backups" => {
                self.max_backups = value.trim().parse().map_err(|_| MsError::ConfigError {
                    message: format!("max_backups expects a number, got '{}'", value),
                })?;
            }
            other => {
                return Err(MsError::ConfigError {
                    message: format!("Unknown configuration key: {}", other),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_updates_known_keys() {
        let mut config = Config::default();

        config.apply_set("max_backups=3").expect("set max_backups");
        assert_eq!(config.max_backups, 3);

        config.apply_set("auto_backup=false").expect("set auto_backup");
        assert!(!config.auto_backup);

        config.apply_set("data_dir=/tmp/mstone-data").expect("set data_dir");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/mstone-data"));
    }

    #[test]
    fn set_rejects_unknown_keys_and_bad_values() {
        let mut config = Config::default();
        assert!(config.apply_set("not_a_key=1").is_err());
        assert!(config.apply_set("max_backups=lots").is_err());
        assert!(config.apply_set("just-a-word").is_err());
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("config.json");

        let config = Config::load(&path).expect("load defaults");
        assert_eq!(config.max_backups, Config::default().max_backups);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.max_backups = 7;
        config.save(&path).expect("save config");

        let loaded = Config::load(&path).expect("load config");
        assert_eq!(loaded.max_backups, 7);
    }
}
