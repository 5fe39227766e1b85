//! The downloader application context
//!
//! [`Downloader`] ties together the configuration, the [`RepoManager`], the
//! installed cog registry and the command lookup. Everything the command
//! surface does goes through it.

use cogsmith_core::{Installable, InstalledRecord, InstalledRegistry};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::DownloaderConfig;
use crate::error::{RepoError, Result};
use crate::lookup::{CommandLookup, CommandOwner, IndexFileLookup};
use crate::manager::RepoManager;
use crate::pip::requirement_name;
use crate::repo::Repo;
use crate::runner::ProcessRunner;
use crate::tracker::UpdateResult;

/// Author shown by `findcog` for commands outside installed cogs
pub const CORE_AUTHOR: &str = "26 & co.";

/// Repository shown by `findcog` for commands outside installed cogs
pub const CORE_REPO_URL: &str = "https://github.com/Cog-Creators/Red-DiscordBot";

/// Result of a cog installation request
#[derive(Debug)]
pub enum InstallOutcome {
    Installed {
        cog: Installable,
        path: PathBuf,
        failed_libraries: Vec<Installable>,
    },
    /// No such cog in the repository
    NotFound,
    /// The interpreter is older than the cog requires
    PythonTooOld { required: String },
    /// pip could not install the cog's requirements
    RequirementsFailed { requirements: Vec<String> },
}

/// Result of an uninstall request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UninstallOutcome {
    Removed,
    /// The cog is recorded but its files are gone; the record is kept
    FilesMissing,
    NotInstalled,
}

/// What `update_cogs` did
#[derive(Debug, Default)]
pub struct UpdateReport {
    /// Repositories that changed
    pub updates: BTreeMap<String, UpdateResult>,

    /// Repositories that failed to update
    pub errors: BTreeMap<String, RepoError>,

    /// Installed cogs that were reinstalled, by repository
    pub updated_cogs: BTreeMap<String, Vec<String>>,

    pub failed_requirements: Vec<String>,
    pub failed_cogs: Vec<String>,
    pub failed_libraries: Vec<String>,
}

impl UpdateReport {
    /// Whether no installed cog needed updating
    pub fn is_up_to_date(&self) -> bool {
        self.updated_cogs.is_empty()
    }
}

/// The downloader
pub struct Downloader {
    config: DownloaderConfig,
    manager: RepoManager,
    installed: Mutex<InstalledRegistry>,
    lookup: Box<dyn CommandLookup>,
}

impl Downloader {
    /// Create the downloader, preparing its directories
    ///
    /// Repositories are not loaded; call [`Downloader::load_repos`].
    pub fn new(
        config: DownloaderConfig,
        runner: Arc<dyn ProcessRunner>,
        lookup: Box<dyn CommandLookup>,
    ) -> Result<Self> {
        config.ensure_dirs()?;
        let installed = InstalledRegistry::load(config.installed_path())?;
        let manager = RepoManager::from_config(&config, runner);

        Ok(Self {
            config,
            manager,
            installed: Mutex::new(installed),
            lookup,
        })
    }

    /// Create the downloader with the configured command index and load
    /// every repository from disk
    pub async fn open(config: DownloaderConfig, runner: Arc<dyn ProcessRunner>) -> Result<Self> {
        let lookup = match &config.command_index {
            Some(path) => IndexFileLookup::load(path)?,
            None => IndexFileLookup::default(),
        };

        let downloader = Self::new(config, runner, Box::new(lookup))?;
        downloader.load_repos().await?;
        Ok(downloader)
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    pub fn manager(&self) -> &RepoManager {
        &self.manager
    }

    pub async fn load_repos(&self) -> Result<Vec<String>> {
        self.manager.load_repos().await
    }

    fn repo(&self, name: &str) -> Result<Arc<dyn Repo>> {
        self.manager.get_repo(name).ok_or_else(|| RepoError::MissingRepo {
            name: name.to_string(),
        })
    }

    // ============ Installed Cogs ============

    /// Registry records, including cogs whose repository is gone
    pub async fn installed_records(&self) -> Vec<InstalledRecord> {
        self.installed.lock().await.records().to_vec()
    }

    /// Installed cogs that still exist in a known repository
    pub async fn installed_cogs(&self) -> Vec<Installable> {
        let records = self.installed_records().await;

        records
            .iter()
            .filter_map(|record| {
                let Some(repo) = self.manager.get_repo(&record.repo_name) else {
                    tracing::warn!(
                        "Installed cog {} refers to unknown repo {}",
                        record.cog_name,
                        record.repo_name
                    );
                    return None;
                };
                repo.available_modules()
                    .into_iter()
                    .find(|m| m.name == record.cog_name)
            })
            .collect()
    }

    /// The installed cog with this name, if any
    pub async fn is_installed(&self, cog_name: &str) -> Option<Installable> {
        self.installed_cogs()
            .await
            .into_iter()
            .find(|c| c.name == cog_name)
    }

    async fn record_installed(&self, cog: &Installable, version: Option<String>) -> Result<()> {
        let mut installed = self.installed.lock().await;
        installed.add(cog.to_record(version));
        installed.save()?;
        Ok(())
    }

    async fn module_version(repo: &dyn Repo, cog: &Installable) -> Result<Option<String>> {
        match repo.module_version(cog).await {
            Err(e) if e.is_unsupported() => Ok(None),
            other => other,
        }
    }

    // ============ Install / Uninstall ============

    /// Install a cog and its requirements, then the repository's shared
    /// libraries
    pub async fn install_cog(&self, repo_name: &str, cog_name: &str) -> Result<InstallOutcome> {
        let repo = self.repo(repo_name)?;

        let Some(cog) = repo.find_cog(cog_name) else {
            return Ok(InstallOutcome::NotFound);
        };

        match self.manager.python_version().await {
            Ok(version) if !cog.info.python_version.matches(&version) => {
                let required = cog
                    .info
                    .python_version
                    .minimum()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| cog.info.python_version.to_string());
                return Ok(InstallOutcome::PythonTooOld { required });
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Skipping python version check for {}: {}", cog.name, e);
            }
        }

        if !self.manager.install_requirements(&cog).await? {
            return Ok(InstallOutcome::RequirementsFailed {
                requirements: cog.info.requirements.clone(),
            });
        }

        let version = Self::module_version(repo.as_ref(), &cog).await?;
        let path = repo.install_cog(&cog, &self.config.install_path()).await?;
        self.record_installed(&cog, version).await?;

        let failed_libraries = repo
            .install_libraries(&[], &self.config.shared_lib_path())
            .await?;

        Ok(InstallOutcome::Installed {
            cog,
            path,
            failed_libraries,
        })
    }

    /// Remove an installed cog's files and its record
    pub async fn uninstall_cog(&self, cog_name: &str) -> Result<UninstallOutcome> {
        let mut installed = self.installed.lock().await;

        let Some(record) = installed.find(cog_name).cloned() else {
            return Ok(UninstallOutcome::NotInstalled);
        };

        let target = self.config.install_path().join(&record.cog_name);
        if !target.exists() {
            return Ok(UninstallOutcome::FilesMissing);
        }

        delete_path(&target)?;
        installed.remove(&record.repo_name, &record.cog_name);
        installed.save()?;
        Ok(UninstallOutcome::Removed)
    }

    // ============ Updating ============

    /// Update one installed cog's repository, or every repository, and
    /// reinstall the installed cogs that changed
    pub async fn update_cogs(&self, cog_name: Option<&str>) -> Result<UpdateReport> {
        let installed_cogs = self.installed_cogs().await;

        let target = match cog_name {
            Some(name) => Some(
                installed_cogs
                    .iter()
                    .find(|c| c.name == name)
                    .cloned()
                    .ok_or_else(|| RepoError::MissingModule {
                        message: format!("the {} cog is not installed", name),
                    })?,
            ),
            None => None,
        };

        let mut report = UpdateReport::default();

        let results = match &target {
            Some(cog) => {
                let mut results = BTreeMap::new();
                match self.manager.update_repo(&cog.repo_name).await {
                    Ok(Some(result)) => {
                        results.insert(cog.repo_name.clone(), Ok(result));
                    }
                    Ok(None) => {}
                    Err(e) if e.is_unsupported() => {
                        tracing::debug!("Skipping update of repo {}: {}", cog.repo_name, e);
                    }
                    Err(e) => {
                        results.insert(
                            cog.repo_name.clone(),
                            Err(RepoError::update(&cog.repo_name, e)),
                        );
                    }
                }
                results
            }
            None => self.manager.update_all_repos().await,
        };

        for (repo_name, result) in results {
            match result {
                Ok(update) => {
                    report.updates.insert(repo_name, update);
                }
                Err(e) => {
                    report.errors.insert(repo_name, e);
                }
            }
        }

        // Installed cogs whose module changed
        let to_reinstall: Vec<Installable> = report
            .updates
            .values()
            .flat_map(|update| update.updated.cogs.iter())
            .filter(|c| installed_cogs.contains(*c))
            .filter(|c| target.as_ref().is_none_or(|t| t == *c))
            .cloned()
            .collect();

        if to_reinstall.is_empty() {
            return Ok(report);
        }

        report.failed_requirements = self.reinstall_requirements(&to_reinstall).await?;

        for cog in &to_reinstall {
            match self.reinstall_cog(cog).await {
                Ok(()) => report
                    .updated_cogs
                    .entry(cog.repo_name.clone())
                    .or_default()
                    .push(cog.name.clone()),
                Err(e) => {
                    tracing::warn!("Failed to reinstall {}: {}", cog.name, e);
                    report.failed_cogs.push(cog.name.clone());
                }
            }
        }

        let repos: BTreeSet<&str> = to_reinstall.iter().map(|c| c.repo_name.as_str()).collect();
        for repo_name in repos {
            let repo = self.repo(repo_name)?;
            let failed = repo
                .install_libraries(&[], &self.config.shared_lib_path())
                .await?;
            report
                .failed_libraries
                .extend(failed.into_iter().map(|lib| lib.name));
        }

        Ok(report)
    }

    async fn reinstall_requirements(&self, cogs: &[Installable]) -> Result<Vec<String>> {
        let requirements: BTreeSet<&String> = cogs
            .iter()
            .flat_map(|c| c.info.requirements.iter())
            .collect();

        let mut failed = Vec::new();
        for requirement in requirements {
            if !self
                .manager
                .pip_install(std::slice::from_ref(requirement), None)
                .await?
            {
                failed.push(requirement.clone());
            }
        }
        Ok(failed)
    }

    async fn reinstall_cog(&self, cog: &Installable) -> Result<()> {
        let repo = self.repo(&cog.repo_name)?;
        let version = Self::module_version(repo.as_ref(), cog).await?;
        repo.install_cog(cog, &self.config.install_path()).await?;
        self.record_installed(cog, version).await
    }

    /// Files changed in a repository by an update
    pub async fn changed_files(&self, update: &UpdateResult) -> Result<BTreeMap<String, String>> {
        let (Some(old), Some(new)) = (&update.old_version, &update.new_version) else {
            return Ok(BTreeMap::new());
        };
        let repo = self.repo(&update.repo_name)?;
        repo.changed_files(old, new).await
    }

    // ============ pip ============

    /// Install arbitrary packages with pip
    pub async fn pip_install(&self, packages: &[String]) -> Result<bool> {
        self.manager.pip_install(packages, None).await
    }

    /// Installed version of each of a cog's requirements, keyed by requirement
    pub async fn requirement_versions(
        &self,
        cog: &Installable,
    ) -> Result<BTreeMap<String, Option<String>>> {
        let names: Vec<String> = cog
            .info
            .requirements
            .iter()
            .map(|r| requirement_name(r).to_string())
            .collect();
        let versions = self.manager.pip_show(&names, None).await?;

        Ok(cog
            .info
            .requirements
            .iter()
            .map(|r| {
                let version = versions.get(requirement_name(r)).cloned().flatten();
                (r.clone(), version)
            })
            .collect())
    }

    // ============ findcog ============

    /// Describe the cog that provides `command`; `None` if the command is unknown
    pub async fn find_cog(&self, command: &str) -> Result<Option<String>> {
        let Some(owner) = self.lookup.command_owner(command) else {
            return Ok(None);
        };

        let message = match self.is_installed(owner.package_name()).await {
            Some(cog) => self.format_findcog_info(command, &cog),
            None => format_core_findcog_info(command, &owner),
        };
        Ok(Some(message))
    }

    /// Describe an installed cog for `findcog`
    pub fn format_findcog_info(&self, command: &str, cog: &Installable) -> String {
        let made_by = if cog.info.author.is_empty() {
            "Missing from info.json".to_string()
        } else {
            cog.info.author.join(", ")
        };

        let repo_url = self
            .manager
            .get_repo(&cog.repo_name)
            .map(|repo| {
                repo.url()
                    .unwrap_or_else(|| repo.folder_path().display().to_string())
            })
            .unwrap_or_default();

        findcog_message(command, &made_by, &repo_url, &cog.name)
    }
}

fn format_core_findcog_info(command: &str, owner: &CommandOwner) -> String {
    findcog_message(command, CORE_AUTHOR, CORE_REPO_URL, owner.cog_name())
}

fn findcog_message(command: &str, made_by: &str, repo_url: &str, cog_name: &str) -> String {
    format!(
        "Command: {}\nMade by: {}\nRepo: {}\nCog name: {}",
        command, made_by, repo_url, cog_name
    )
}

fn delete_path(target: &Path) -> Result<()> {
    if target.is_dir() {
        std::fs::remove_dir_all(target)?;
    } else if target.is_file() {
        std::fs::remove_file(target)?;
    }
    Ok(())
}
