//! Local folder repositories

use async_trait::async_trait;
use cogsmith_core::{Installable, RepoInfo};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::error::{RepoError, Result};
use crate::repo::{Repo, RepoKind};

/// Marker file that makes a directory an importable package
pub const PACKAGE_MARKER: &str = "__init__.py";

/// Whether `folder` contains a `.git` directory
pub fn is_path_git_repo(folder: &Path) -> bool {
    folder.join(".git").is_dir()
}

#[derive(Debug, Default)]
struct FolderState {
    info: RepoInfo,
    modules: Vec<Installable>,
}

/// A repository backed by a plain folder
///
/// Modules are the top-level package directories. Folder repositories have
/// no versions and cannot be updated.
#[derive(Debug)]
pub struct FolderRepo {
    name: String,
    folder_path: PathBuf,
    state: RwLock<FolderState>,
}

impl FolderRepo {
    pub fn new(name: impl Into<String>, folder_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            folder_path: folder_path.into(),
            state: RwLock::new(FolderState::default()),
        }
    }

    /// Load an existing folder, named after its last path component
    pub fn from_folder(folder: &Path) -> Result<Self> {
        let name = folder_name(folder)?;
        let repo = Self::new(name, folder);
        repo.populate()?;
        Ok(repo)
    }

    pub fn is_git_repo(&self) -> bool {
        is_path_git_repo(&self.folder_path)
    }

    /// Rescan the folder for modules
    pub fn update_available_modules(&self) -> Result<Vec<Installable>> {
        let modules = scan_modules(&self.name, &self.folder_path)?;
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .modules = modules.clone();
        Ok(modules)
    }

    /// Reload the repository `info.json`
    pub fn read_info_file(&self) {
        let info = RepoInfo::load(&self.folder_path);
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .info = info;
    }

    fn check_owned(&self, module: &Installable) -> Result<()> {
        if module.repo_name != self.name {
            return Err(RepoError::InstallationError {
                message: format!(
                    "the {} module does not belong to the {} repo",
                    module.name, self.name
                ),
            });
        }
        Ok(())
    }
}

pub(crate) fn folder_name(folder: &Path) -> Result<String> {
    folder
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| RepoError::Other(format!("not a repository folder: {}", folder.display())))
}

/// Top-level package directories of `folder`, sorted by name
fn scan_modules(repo_name: &str, folder: &Path) -> Result<Vec<Installable>> {
    if !folder.is_dir() {
        return Ok(Vec::new());
    }

    let mut modules = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        if name.starts_with('.') || name.contains('.') || !path.is_dir() {
            continue;
        }
        if !path.join(PACKAGE_MARKER).is_file() {
            continue;
        }

        modules.push(Installable::from_location(repo_name, path));
    }

    modules.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(modules)
}

#[async_trait]
impl Repo for FolderRepo {
    fn name(&self) -> &str {
        &self.name
    }

    fn folder_path(&self) -> &Path {
        &self.folder_path
    }

    fn kind(&self) -> RepoKind {
        RepoKind::Folder
    }

    fn info(&self) -> RepoInfo {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .info
            .clone()
    }

    fn available_modules(&self) -> Vec<Installable> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .modules
            .clone()
    }

    async fn repo_version(&self) -> Result<Option<String>> {
        Err(RepoError::Unsupported {
            operation: "repository versioning",
        })
    }

    async fn module_version(&self, _module: &Installable) -> Result<Option<String>> {
        Err(RepoError::Unsupported {
            operation: "module versioning",
        })
    }

    fn populate(&self) -> Result<()> {
        std::fs::create_dir_all(&self.folder_path)?;
        self.read_info_file();
        self.update_available_modules()?;
        Ok(())
    }

    async fn update_files(&self) -> Result<()> {
        Err(RepoError::Unsupported {
            operation: "updating",
        })
    }

    async fn changed_files(&self, _old: &str, _new: &str) -> Result<BTreeMap<String, String>> {
        Err(RepoError::Unsupported {
            operation: "file change listing",
        })
    }

    async fn delete(&self) -> Result<()> {
        if self.folder_path.exists() {
            std::fs::remove_dir_all(&self.folder_path)?;
        }
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.modules.clear();
        Ok(())
    }

    async fn install_cog(&self, cog: &Installable, target_dir: &Path) -> Result<PathBuf> {
        self.check_owned(cog)?;
        if !self.available_cogs().contains(cog) {
            return Err(RepoError::MissingModule {
                message: format!("the {} cog is not available in the {} repo", cog.name, self.name),
            });
        }

        if !target_dir.exists() {
            return Err(RepoError::InstallationError {
                message: format!("install target {} does not exist", target_dir.display()),
            });
        }
        if !target_dir.is_dir() {
            return Err(RepoError::InstallationError {
                message: format!("install target {} is not a directory", target_dir.display()),
            });
        }

        Ok(cog.copy_to(target_dir)?)
    }

    async fn install_libraries(
        &self,
        libraries: &[Installable],
        target_dir: &Path,
    ) -> Result<Vec<Installable>> {
        let available = self.available_libraries();

        let libraries = if libraries.is_empty() {
            available
        } else {
            for lib in libraries {
                self.check_owned(lib)?;
            }
            if !libraries.iter().all(|lib| available.contains(lib)) {
                return Err(RepoError::MissingModule {
                    message: format!("not all libraries are available in the {} repo", self.name),
                });
            }
            libraries.to_vec()
        };

        std::fs::create_dir_all(target_dir)?;

        let mut failed = Vec::new();
        for lib in libraries {
            if let Err(e) = lib.copy_to(target_dir) {
                tracing::warn!("Failed to install shared library {}: {}", lib.name, e);
                failed.push(lib);
            }
        }
        Ok(failed)
    }
}
