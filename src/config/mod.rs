//! Per-user configuration for Gator.
//!
//! Stored as JSON at `~/.gatorconfig.json`:
//!
//! ```json
//! {"db_url": "/home/me/.local/share/gator/gator.db", "current_user_name": "alice"}
//! ```
//!
//! If the file doesn't exist, a default one is created on first load.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = ".gatorconfig.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database location. Falls back to the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_url: Option<String>,
    /// The user commands act on behalf of.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_user_name: Option<String>,

    #[serde(skip)]
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_config_path()?)
    }

    /// Load configuration from `path`, creating a default file if missing.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            let config = Self {
                path: Some(path),
                ..Default::default()
            };
            config.save()?;
            return Ok(config);
        }

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        let mut config: Config = if content.trim().is_empty() {
            Config::default()
        } else {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.clone(),
                source: e,
            })?
        };
        config.path = Some(path);

        Ok(config)
    }

    /// Get the default config file path: `~/.gatorconfig.json`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(CONFIG_FILE_NAME))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Switch the current user and persist the change immediately.
    pub fn set_current_user(&mut self, name: &str) -> Result<(), ConfigError> {
        self.current_user_name = Some(name.to_string());
        self.save()
    }

    pub fn clear_current_user(&mut self) -> Result<(), ConfigError> {
        self.current_user_name = None;
        self.save()
    }

    /// Write the config back to where it was loaded from. Configs built in
    /// memory have nowhere to go and are left alone.
    pub fn save(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            source: e,
        })?;

        fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })
    }

    /// Resolve `db_url` to a SQLite file path.
    ///
    /// Accepts a bare path or a `sqlite://` URL. When unset, the database
    /// lives in `<data dir>/gator/gator.db`.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match self.db_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => {
                if let Some(path) = url
                    .strip_prefix("sqlite://")
                    .or_else(|| url.strip_prefix("sqlite:"))
                {
                    return Ok(PathBuf::from(path));
                }
                if url.contains("://") {
                    return Err(ConfigError::UnsupportedDatabase(url.to_string()));
                }
                Ok(PathBuf::from(url))
            }
            _ => {
                let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
                let gator_dir = data_dir.join("gator");
                fs::create_dir_all(&gator_dir).map_err(|e| ConfigError::Io {
                    path: gator_dir.clone(),
                    source: e,
                })?;
                Ok(gator_dir.join("gator.db"))
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Unsupported database url {0}: only SQLite paths are supported")]
    UnsupportedDatabase(String),
}
