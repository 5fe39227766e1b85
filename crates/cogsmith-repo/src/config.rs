//! Downloader configuration
//!
//! Stored in `~/.config/cogsmith/config.yaml`. Every field is optional in the
//! file; a missing file means defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RepoError, Result};
use crate::folder::PACKAGE_MARKER;

/// Environment variable set by an active virtualenv
const VIRTUAL_ENV: &str = "VIRTUAL_ENV";

/// Downloader configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloaderConfig {
    /// Root of all downloader data (repos, lib, installed registry)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Where cogs are installed; `<data_dir>/cogs` when unset
    #[serde(default)]
    pub cog_install_path: Option<PathBuf>,

    /// Python interpreter used for pip
    #[serde(default = "default_python")]
    pub python: String,

    /// Maximum number of concurrent subprocesses
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Override virtualenv detection
    #[serde(default)]
    pub force_venv: Option<bool>,

    /// JSON file mapping command names to the module that defines them
    #[serde(default)]
    pub command_index: Option<PathBuf>,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("cogsmith"))
        .unwrap_or_else(|| PathBuf::from(".cogsmith"))
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_threads() -> usize {
    4
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            cog_install_path: None,
            python: default_python(),
            threads: default_threads(),
            force_venv: None,
            command_index: None,
        }
    }
}

impl DownloaderConfig {
    /// Load configuration from default location
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&content)?;
        if config.threads == 0 {
            return Err(RepoError::InvalidConfig {
                message: "threads must be at least 1".to_string(),
            });
        }
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| RepoError::InvalidConfig {
            message: "Could not determine config directory".to_string(),
        })?;
        Ok(config_dir.join("cogsmith").join("config.yaml"))
    }

    /// Replace the data directory
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Folder holding one subfolder per repository
    pub fn repos_folder(&self) -> PathBuf {
        self.data_dir.join("repos")
    }

    /// pip target directory when not running inside a virtualenv
    pub fn lib_path(&self) -> PathBuf {
        self.data_dir.join("lib")
    }

    /// Package directory shared libraries are installed into
    pub fn shared_lib_path(&self) -> PathBuf {
        self.lib_path().join("cog_shared")
    }

    /// Installed cog registry file
    pub fn installed_path(&self) -> PathBuf {
        self.data_dir.join("installed.json")
    }

    /// Cog install directory
    pub fn install_path(&self) -> PathBuf {
        self.cog_install_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("cogs"))
    }

    /// Whether pip should install into the active environment
    pub fn is_venv(&self) -> bool {
        self.force_venv
            .unwrap_or_else(|| std::env::var_os(VIRTUAL_ENV).is_some())
    }

    /// Create the data, lib, shared library and install directories
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(self.repos_folder())?;
        std::fs::create_dir_all(self.install_path())?;

        let shared = self.shared_lib_path();
        std::fs::create_dir_all(&shared)?;
        let marker = shared.join(PACKAGE_MARKER);
        if !marker.exists() {
            std::fs::write(marker, "")?;
        }
        Ok(())
    }
}
