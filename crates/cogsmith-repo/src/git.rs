//! Git repositories
//!
//! A [`GitRepo`] is a [`FolderRepo`] whose folder is a git clone. Every git
//! command for one repository is serialized behind that repository's lock,
//! so different repositories can be updated concurrently.

use async_trait::async_trait;
use cogsmith_core::{Installable, RepoInfo};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;

use crate::command::{COMMANDS, CommandTemplate, FormatArgs};
use crate::error::{RepoError, Result};
use crate::folder::{FolderRepo, folder_name};
use crate::repo::{Repo, RepoKind};
use crate::runner::{ProcessOutput, ProcessRunner};

/// Environment for every git invocation; never wait for credentials
const GIT_ENV: [(&str, &str); 1] = [("GIT_TERMINAL_PROMPT", "0")];

/// A repository cloned from a git remote
pub struct GitRepo {
    folder: FolderRepo,
    url: RwLock<Option<String>>,
    branch: RwLock<Option<String>>,
    runner: Arc<dyn ProcessRunner>,
    lock: Mutex<()>,
}

impl GitRepo {
    pub fn new(
        name: impl Into<String>,
        folder_path: impl Into<PathBuf>,
        url: Option<String>,
        branch: Option<String>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            folder: FolderRepo::new(name, folder_path),
            url: RwLock::new(url),
            branch: RwLock::new(branch),
            runner,
            lock: Mutex::new(()),
        }
    }

    /// Load an existing clone, discovering its branch and remote URL
    pub async fn from_folder(folder: &Path, runner: Arc<dyn ProcessRunner>) -> Result<Self> {
        let name = folder_name(folder)?;
        let repo = Self::new(name, folder, None, None, runner);
        repo.populate()?;

        let branch = repo.current_branch().await?;
        let url = repo.current_url().await?;
        repo.set_branch(Some(branch));
        *repo.url.write().unwrap_or_else(PoisonError::into_inner) = Some(url);

        Ok(repo)
    }

    pub fn is_git_repo(&self) -> bool {
        self.folder.is_git_repo()
    }

    fn path_arg(&self) -> String {
        self.folder.folder_path().to_string_lossy().into_owned()
    }

    fn set_branch(&self, branch: Option<String>) {
        *self.branch.write().unwrap_or_else(PoisonError::into_inner) = branch;
    }

    fn ensure_git_repo(&self) -> Result<()> {
        if !self.is_git_repo() {
            return Err(RepoError::MissingGitRepo {
                path: self.folder.folder_path().display().to_string(),
            });
        }
        Ok(())
    }

    async fn run(&self, template: &CommandTemplate, args: FormatArgs) -> Result<ProcessOutput> {
        let argv = template.format(&args)?;
        let env: Vec<(String, String)> = GIT_ENV
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let _guard = self.lock.lock().await;
        self.runner.run(&argv, &env).await
    }

    /// Clone the remote into the repository folder and scan it
    ///
    /// When no branch was given, the remote's default branch is recorded.
    pub async fn clone_repo(&self) -> Result<()> {
        if self.is_git_repo() {
            return Err(RepoError::ExistingGitRepo {
                path: self.folder.folder_path().display().to_string(),
            });
        }

        let url = self.url().ok_or_else(|| RepoError::Git {
            message: format!("no remote URL set for repo {}", self.folder.name()),
        })?;

        let output = match self.branch() {
            Some(branch) => {
                self.run(
                    &COMMANDS.git_clone,
                    FormatArgs::new()
                        .kwarg("branch", branch)
                        .kwarg("url", url.as_str())
                        .kwarg("folder", self.path_arg()),
                )
                .await?
            }
            None => {
                self.run(
                    &COMMANDS.git_clone_no_branch,
                    FormatArgs::new()
                        .kwarg("url", url.as_str())
                        .kwarg("folder", self.path_arg()),
                )
                .await?
            }
        };

        if !output.success() {
            return Err(RepoError::CloningError {
                url,
                stderr: output.stderr.trim().to_string(),
            });
        }

        if self.branch().is_none() {
            let branch = self.current_branch().await?;
            self.set_branch(Some(branch));
        }

        self.populate()
    }

    /// Name of the checked out branch
    pub async fn current_branch(&self) -> Result<String> {
        self.ensure_git_repo()?;

        let output = self
            .run(
                &COMMANDS.git_current_branch,
                FormatArgs::new().kwarg("path", self.path_arg()),
            )
            .await?;

        if !output.success() {
            return Err(RepoError::Git {
                message: format!(
                    "Could not determine current branch at path: {}",
                    self.folder.folder_path().display()
                ),
            });
        }

        Ok(output.stdout_trimmed().to_string())
    }

    /// Latest commit on `branch` touching `relative_file_path`
    ///
    /// Defaults to the repository branch and the whole tree. Returns `None`
    /// when the path is not tracked.
    pub async fn current_commit(
        &self,
        branch: Option<&str>,
        relative_file_path: Option<&str>,
    ) -> Result<Option<String>> {
        self.ensure_git_repo()?;

        let branch = branch
            .map(str::to_string)
            .or_else(|| self.branch())
            .unwrap_or_else(|| "HEAD".to_string());

        let output = self
            .run(
                &COMMANDS.git_latest_commit,
                FormatArgs::new()
                    .kwarg("path", self.path_arg())
                    .kwarg("branch", branch)
                    .kwarg_list("relative_file_path", [relative_file_path.unwrap_or(".")]),
            )
            .await?;

        if !output.success() {
            return Err(RepoError::CurrentHashError {
                path: self.folder.folder_path().display().to_string(),
            });
        }

        let hash = output.stdout_trimmed();
        Ok((!hash.is_empty()).then(|| hash.to_string()))
    }

    /// Fetch URL of the `origin` remote
    pub async fn current_url(&self) -> Result<String> {
        self.ensure_git_repo()?;

        let output = self
            .run(
                &COMMANDS.git_discover_remote_url,
                FormatArgs::new()
                    .kwarg("path", self.path_arg())
                    .kwarg("remote", "origin"),
            )
            .await?;

        if !output.success() {
            return Err(RepoError::Git {
                message: format!(
                    "Unable to discover a repo URL at path: {}",
                    self.folder.folder_path().display()
                ),
            });
        }

        Ok(output.stdout_trimmed().to_string())
    }

    /// Reset the working tree to `origin/<branch>`
    pub async fn hard_reset(&self, branch: Option<&str>) -> Result<()> {
        self.ensure_git_repo()?;

        let branch = branch
            .map(str::to_string)
            .or_else(|| self.branch())
            .unwrap_or_else(|| "HEAD".to_string());

        let output = self
            .run(
                &COMMANDS.git_hard_reset,
                FormatArgs::new()
                    .kwarg("path", self.path_arg())
                    .kwarg("branch", branch),
            )
            .await?;

        if !output.success() {
            return Err(RepoError::HardResetError {
                path: self.folder.folder_path().display().to_string(),
            });
        }
        Ok(())
    }

    /// Status letter of every file changed between two refs
    pub async fn file_update_statuses(
        &self,
        old_ref: &str,
        new_ref: &str,
    ) -> Result<BTreeMap<String, String>> {
        self.ensure_git_repo()?;

        let output = self
            .run(
                &COMMANDS.git_diff_file_status,
                FormatArgs::new()
                    .kwarg("path", self.path_arg())
                    .kwarg("old_ref", old_ref)
                    .kwarg("new_ref", new_ref),
            )
            .await?;

        if !output.success() {
            return Err(RepoError::GitDiffError {
                path: self.folder.folder_path().display().to_string(),
            });
        }

        Ok(parse_name_status(&output.stdout))
    }

    /// Switch the working tree to a local branch
    pub async fn checkout(&self, branch: &str) -> Result<()> {
        self.ensure_git_repo()?;

        let output = self
            .run(
                &COMMANDS.git_checkout_local,
                FormatArgs::new()
                    .kwarg("path", self.path_arg())
                    .kwarg("branch", branch),
            )
            .await?;

        if !output.success() {
            return Err(RepoError::Git {
                message: format!(
                    "git checkout {} failed for repo at path: {}",
                    branch,
                    self.folder.folder_path().display()
                ),
            });
        }
        Ok(())
    }

    /// Commit log for a path since `old_ref`
    pub async fn commit_notes(&self, old_ref: &str, relative_file_path: &str) -> Result<String> {
        self.ensure_git_repo()?;

        let output = self
            .run(
                &COMMANDS.git_log,
                FormatArgs::new()
                    .kwarg("path", self.path_arg())
                    .kwarg("old_ref", old_ref)
                    .kwarg("relative_file_path", relative_file_path),
            )
            .await?;

        if !output.success() {
            return Err(RepoError::Git {
                message: format!(
                    "git log failed for repo at path: {}",
                    self.folder.folder_path().display()
                ),
            });
        }

        Ok(output.stdout_trimmed().to_string())
    }
}

/// Parse `git diff --name-status` output into path -> status letter
fn parse_name_status(stdout: &str) -> BTreeMap<String, String> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let (status, path) = line.split_once('\t').unwrap_or((line, ""));
            (path.to_string(), status.to_string())
        })
        .collect()
}

#[async_trait]
impl Repo for GitRepo {
    fn name(&self) -> &str {
        self.folder.name()
    }

    fn folder_path(&self) -> &Path {
        self.folder.folder_path()
    }

    fn kind(&self) -> RepoKind {
        RepoKind::Git
    }

    fn url(&self) -> Option<String> {
        self.url.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn branch(&self) -> Option<String> {
        self.branch
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn info(&self) -> RepoInfo {
        self.folder.info()
    }

    fn available_modules(&self) -> Vec<Installable> {
        self.folder.available_modules()
    }

    async fn repo_version(&self) -> Result<Option<String>> {
        self.current_commit(None, None).await
    }

    async fn module_version(&self, module: &Installable) -> Result<Option<String>> {
        let relative = module.relative_location(self.folder.folder_path());
        let relative = relative.to_string_lossy().into_owned();
        self.current_commit(None, Some(relative.as_str())).await
    }

    fn populate(&self) -> Result<()> {
        self.folder.populate()
    }

    /// Hard reset to the remote branch, fast-forward pull, then rescan
    async fn update_files(&self) -> Result<()> {
        let mut branch = self.current_branch().await?;
        if let Some(wanted) = self.branch().filter(|wanted| *wanted != branch) {
            tracing::debug!("{} is on {}, switching back to {}", self.name(), branch, wanted);
            self.checkout(&wanted).await?;
            branch = wanted;
        }
        self.hard_reset(Some(&branch)).await?;

        let output = self
            .run(&COMMANDS.git_pull, FormatArgs::new().kwarg("path", self.path_arg()))
            .await?;

        if !output.success() {
            return Err(RepoError::GitUpdateError {
                path: self.folder.folder_path().display().to_string(),
            });
        }

        self.folder.update_available_modules()?;
        self.folder.read_info_file();
        Ok(())
    }

    async fn changed_files(
        &self,
        old_version: &str,
        new_version: &str,
    ) -> Result<BTreeMap<String, String>> {
        self.file_update_statuses(old_version, new_version).await
    }

    async fn delete(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.folder.delete().await
    }

    async fn install_cog(&self, cog: &Installable, target_dir: &Path) -> Result<PathBuf> {
        self.folder.install_cog(cog, target_dir).await
    }

    async fn install_libraries(
        &self,
        libraries: &[Installable],
        target_dir: &Path,
    ) -> Result<Vec<Installable>> {
        self.folder.install_libraries(libraries, target_dir).await
    }
}
