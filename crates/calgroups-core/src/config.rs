//! Application configuration management.
//!
//! Configuration is stored at `~/.config/calgroups/config.json` and names the
//! groups file and the backup retention limit. Both are optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GroupError, GroupResult};
use crate::storage::{DEFAULT_MAX_BACKUPS, GROUPS_FILE};

/// Application name used for config directory paths
const APP_NAME: &str = "calgroups";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the groups file location
pub const GROUPS_FILE_ENV: &str = "CALGROUPS_FILE";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub groups_file: Option<PathBuf>,
    #[serde(default)]
    pub max_backups: Option<usize>,
}

impl Config {
    pub fn load() -> GroupResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> GroupResult<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_json::from_str(&contents).map_err(|e| {
                GroupError::validation(format!("Invalid config file {}: {}", path.display(), e))
            })
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> GroupResult<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> GroupResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| GroupError::storage(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_dir() -> GroupResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| GroupError::storage("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME))
    }

    pub fn config_path() -> GroupResult<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Groups file: `CALGROUPS_FILE`, then `groups_file`, then the default
    /// location in the config directory.
    pub fn groups_path(&self) -> GroupResult<PathBuf> {
        let from_env = std::env::var_os(GROUPS_FILE_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        self.resolve_groups_path(from_env)
    }

    fn resolve_groups_path(&self, from_env: Option<PathBuf>) -> GroupResult<PathBuf> {
        if let Some(path) = from_env.or_else(|| self.groups_file.clone()) {
            return Ok(path);
        }
        Ok(Self::config_dir()?.join(GROUPS_FILE))
    }

    pub fn backup_limit(&self) -> usize {
        self.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS)
    }
}
