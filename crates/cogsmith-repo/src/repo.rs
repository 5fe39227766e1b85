//! The repository abstraction
//!
//! A repository is a folder of installable modules, either a plain local
//! folder ([`FolderRepo`](crate::FolderRepo)) or a git clone
//! ([`GitRepo`](crate::GitRepo)). Both are used through the [`Repo`] trait.

use async_trait::async_trait;
use cogsmith_core::{Installable, InstallableType, RepoInfo};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::tracker::{UpdateResult, UpdateTracker};

/// Kind of repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoKind {
    Folder,
    Git,
}

impl RepoKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoKind::Folder => "folder",
            RepoKind::Git => "git",
        }
    }
}

impl fmt::Display for RepoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An installable source
#[async_trait]
pub trait Repo: Send + Sync {
    /// Unique, lowercase repository name
    fn name(&self) -> &str;

    /// Folder holding the repository files
    fn folder_path(&self) -> &Path;

    fn kind(&self) -> RepoKind;

    /// Remote URL, for repositories that have one
    fn url(&self) -> Option<String> {
        None
    }

    /// Checked out branch, for repositories that have one
    fn branch(&self) -> Option<String> {
        None
    }

    /// Repository level metadata
    fn info(&self) -> RepoInfo;

    /// Every module found in the repository, sorted by name
    fn available_modules(&self) -> Vec<Installable>;

    /// Cogs that can be installed (hidden cogs included, disabled ones not)
    fn available_cogs(&self) -> Vec<Installable> {
        self.available_modules()
            .into_iter()
            .filter(|m| m.kind() == InstallableType::Cog && !m.info.disabled)
            .collect()
    }

    /// Shared libraries provided by the repository
    fn available_libraries(&self) -> Vec<Installable> {
        self.available_modules()
            .into_iter()
            .filter(Installable::is_shared_library)
            .collect()
    }

    /// Find an available cog by name
    fn find_cog(&self, name: &str) -> Option<Installable> {
        self.available_cogs().into_iter().find(|c| c.name == name)
    }

    /// Overall version of the repository contents
    ///
    /// Fails with `Unsupported` for repository types without versions.
    async fn repo_version(&self) -> Result<Option<String>>;

    /// Version of one module
    ///
    /// Fails with `Unsupported` for repository types without module versions.
    async fn module_version(&self, module: &Installable) -> Result<Option<String>>;

    /// (Re)load metadata and modules from disk
    fn populate(&self) -> Result<()>;

    /// Bring the repository files up to date
    async fn update_files(&self) -> Result<()>;

    /// Update the repository and report what changed
    ///
    /// Returns `None` when nothing changed.
    async fn update(&self) -> Result<Option<UpdateResult>> {
        let mut tracker = UpdateTracker::new(self);
        tracker.populate().await?;

        self.update_files().await?;

        tracker.compare().await
    }

    /// Files changed between two versions, mapped to their status letter
    async fn changed_files(
        &self,
        old_version: &str,
        new_version: &str,
    ) -> Result<BTreeMap<String, String>>;

    /// Remove the repository files
    async fn delete(&self) -> Result<()>;

    /// Copy a cog into `target_dir`; returns the installed location
    async fn install_cog(&self, cog: &Installable, target_dir: &Path) -> Result<PathBuf>;

    /// Copy shared libraries into `target_dir`
    ///
    /// An empty `libraries` slice installs every available library. Returns
    /// the libraries that failed to install.
    async fn install_libraries(
        &self,
        libraries: &[Installable],
        target_dir: &Path,
    ) -> Result<Vec<Installable>>;
}

impl fmt::Debug for dyn Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repo")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("folder_path", &self.folder_path())
            .finish()
    }
}
