//! Installable definition and loading
//!
//! An [`Installable`] is one cog or shared library found inside a repository
//! folder. Its metadata comes from the `info.json` next to its code.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{CoreError, Result};
use crate::installed::InstalledRecord;
use crate::manifest::{INFO_FILE_NAME, InstallableInfo, read_info_file};

/// Kind of installable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallableType {
    #[default]
    Unknown,
    Cog,
    SharedLibrary,
}

impl InstallableType {
    /// Map a manifest `type` string; unrecognized names are `Unknown`
    pub fn from_manifest(name: &str) -> Self {
        match name {
            "COG" => InstallableType::Cog,
            "SHARED_LIBRARY" => InstallableType::SharedLibrary,
            _ => InstallableType::Unknown,
        }
    }

    /// Human readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallableType::Unknown => "unknown",
            InstallableType::Cog => "cog",
            InstallableType::SharedLibrary => "shared library",
        }
    }
}

/// Record type tag for folder based installables
pub const FOLDER_INSTALLABLE: &str = "FOLDER";

/// A cog or shared library available from a repository
///
/// The owning repository is referenced by name only; installables never keep
/// a repository alive. Two installables are equal when they belong to the same
/// repository and live at the same location.
#[derive(Debug, Clone)]
pub struct Installable {
    /// Name of the repository this installable belongs to
    pub repo_name: String,

    /// Installable name (last component of the location)
    pub name: String,

    /// Location of the installable on disk (file or folder)
    pub location: PathBuf,

    /// Metadata from info.json
    pub info: InstallableInfo,
}

impl Installable {
    /// Load an installable from its location inside a repository
    ///
    /// The manifest is optional. A missing or invalid `info.json` yields a
    /// plain cog with default metadata.
    pub fn from_location(repo_name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        let location = location.into();
        let name = location
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let info = if location.is_dir() {
            match read_info_file(&location.join(INFO_FILE_NAME)) {
                Ok(Some(map)) => InstallableInfo::from_map(&map),
                Ok(None) => InstallableInfo::default(),
                Err(e) => {
                    tracing::warn!("Invalid JSON information file: {}", e);
                    InstallableInfo::default()
                }
            }
        } else {
            InstallableInfo::default()
        };

        Self {
            repo_name: repo_name.into(),
            name,
            location,
            info,
        }
    }

    /// Installable type
    #[inline]
    pub fn kind(&self) -> InstallableType {
        self.info.kind
    }

    /// Whether this is a cog
    pub fn is_cog(&self) -> bool {
        self.info.kind == InstallableType::Cog
    }

    /// Whether this is a shared library
    pub fn is_shared_library(&self) -> bool {
        self.info.kind == InstallableType::SharedLibrary
    }

    /// Path of the manifest file for this installable
    pub fn info_file(&self) -> PathBuf {
        self.location.join(INFO_FILE_NAME)
    }

    /// Path relative to the repository folder, used for per-module versioning
    pub fn relative_location(&self, repo_folder: &Path) -> PathBuf {
        self.location
            .strip_prefix(repo_folder)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(&self.name))
    }

    /// Build the registry record for this installable
    pub fn to_record(&self, version: Option<String>) -> InstalledRecord {
        InstalledRecord {
            cog_name: self.name.clone(),
            repo_name: self.repo_name.clone(),
            inst_type: FOLDER_INSTALLABLE.to_string(),
            cog_version: version,
            installed_at: Some(chrono::Utc::now()),
        }
    }

    /// Copy this installable into `target_dir`, overwriting existing files
    ///
    /// Folders are merged into `target_dir/<name>`; single files are copied
    /// under their own file name.
    pub fn copy_to(&self, target_dir: &Path) -> Result<PathBuf> {
        if self.location.is_file() {
            let file_name = self.location.file_name().ok_or_else(|| {
                CoreError::LocationNotFound {
                    path: self.location.display().to_string(),
                }
            })?;
            let dest = target_dir.join(file_name);
            std::fs::copy(&self.location, &dest).map_err(|e| self.copy_error(&dest, e))?;
            return Ok(dest);
        }

        if !self.location.is_dir() {
            return Err(CoreError::LocationNotFound {
                path: self.location.display().to_string(),
            });
        }

        let dest = target_dir.join(&self.name);
        copy_tree(&self.location, &dest).map_err(|e| self.copy_error(&dest, e))?;
        Ok(dest)
    }

    fn copy_error(&self, dest: &Path, err: impl std::fmt::Display) -> CoreError {
        CoreError::CopyFailed {
            from: self.location.display().to_string(),
            to: dest.display().to_string(),
            message: err.to_string(),
        }
    }
}

impl PartialEq for Installable {
    fn eq(&self, other: &Self) -> bool {
        self.repo_name == other.repo_name && self.location == other.location
    }
}

impl Eq for Installable {}

impl Hash for Installable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.repo_name.hash(state);
        self.location.hash(state);
    }
}

/// Recursively copy `src` into `dest`, creating directories as needed
fn copy_tree(src: &Path, dest: &Path) -> std::io::Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(std::io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(std::io::Error::other)?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
