//! cogsmith Core - Core types for the cog downloader
//!
//! This crate provides the foundational types used throughout cogsmith:
//! - `Installable`: A cog or shared library found inside a repository
//! - `InstallableInfo` / `RepoInfo`: Metadata parsed from `info.json`
//! - `VersionSpec`: Bot and Python version requirements
//! - `InstalledRegistry`: The persisted list of installed cogs

pub mod error;
pub mod installable;
pub mod installed;
pub mod manifest;
pub mod version;

pub use error::{CoreError, Result};
pub use installable::{FOLDER_INSTALLABLE, Installable, InstallableType};
pub use installed::{InstalledRecord, InstalledRegistry};
pub use manifest::{
    INFO_FILE_NAME, InstallableInfo, RepoInfo, RequiredCog, RequirementRepo, RequirementRepoType,
};
pub use version::{VersionSpec, parse_loose_version};
