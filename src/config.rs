//! TOML configuration.

use crate::error::{Result, SyncError};
use crate::logging::LoggingConfig;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directory backing the remote drive. Usually given on the command
    /// line instead.
    #[serde(default)]
    pub remote_root: Option<PathBuf>,

    /// Where the hash-cache database lives. Defaults to the platform data
    /// directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load from an explicit path, or from the default location if one
    /// exists there. A missing default file yields the default config.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = default_config_path()?;
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            SyncError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&raw)
            .map_err(|e| SyncError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Resolved location of the sled database.
    pub fn database_path(&self) -> Result<PathBuf> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => project_dirs()?.data_dir().to_path_buf(),
        };
        Ok(dir.join("hash-cache"))
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "skiff", "skiff")
        .ok_or_else(|| SyncError::Config("could not determine platform directories".to_string()))
}

fn default_config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.toml"))
}
