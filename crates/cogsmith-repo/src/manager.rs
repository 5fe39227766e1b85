//! Repository manager
//!
//! Owns every known repository by name and mediates all git and pip
//! subprocess execution. pip runs are serialized behind a single lock;
//! git runs are serialized per repository by the repositories themselves.

use cogsmith_core::Installable;
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock};
use tokio::sync::Mutex;

use crate::command::{COMMANDS, FormatArgs};
use crate::config::DownloaderConfig;
use crate::error::{RepoError, Result};
use crate::folder::{FolderRepo, is_path_git_repo};
use crate::git::GitRepo;
use crate::pip::parse_pip_show;
use crate::repo::Repo;
use crate::runner::{ProcessOutput, ProcessRunner};
use crate::tracker::UpdateResult;

static GITHUB_OR_GITLAB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://git(?:hub|lab)\.com/").expect("host pattern is valid")
});

static TREE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<tree>/tree)/(?P<branch>\S+)$").expect("tree pattern is valid")
});

/// Removes a name from the in-flight set when dropped
struct Reservation<'a> {
    pending: &'a StdMutex<HashSet<String>>,
    name: String,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.name);
    }
}

/// Manages the set of repositories
pub struct RepoManager {
    repos_folder: PathBuf,
    repos: RwLock<BTreeMap<String, Arc<dyn Repo>>>,
    pending: StdMutex<HashSet<String>>,
    runner: Arc<dyn ProcessRunner>,
    pip_lock: Mutex<()>,
    python: String,
    lib_path: PathBuf,
    force_venv: Option<bool>,
}

impl RepoManager {
    /// Create an empty manager storing repositories under `repos_folder`
    pub fn new(repos_folder: impl Into<PathBuf>, runner: Arc<dyn ProcessRunner>) -> Self {
        let repos_folder = repos_folder.into();
        let lib_path = repos_folder
            .parent()
            .map(|p| p.join("lib"))
            .unwrap_or_else(|| PathBuf::from("lib"));

        Self {
            repos_folder,
            repos: RwLock::new(BTreeMap::new()),
            pending: StdMutex::new(HashSet::new()),
            runner,
            pip_lock: Mutex::new(()),
            python: "python3".to_string(),
            lib_path,
            force_venv: None,
        }
    }

    /// Create a manager from the downloader configuration
    pub fn from_config(config: &DownloaderConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        Self::new(config.repos_folder(), runner)
            .with_python(config.python.clone())
            .with_lib_path(config.lib_path())
            .with_force_venv(config.force_venv)
    }

    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    /// pip target directory outside a virtualenv
    pub fn with_lib_path(mut self, lib_path: impl Into<PathBuf>) -> Self {
        self.lib_path = lib_path.into();
        self
    }

    /// Override virtualenv detection for pip
    pub fn with_force_venv(mut self, force_venv: Option<bool>) -> Self {
        self.force_venv = force_venv;
        self
    }

    pub fn repos_folder(&self) -> &Path {
        &self.repos_folder
    }

    pub fn lib_path(&self) -> &Path {
        &self.lib_path
    }

    // ============ Naming ============

    /// Check a repository name and return its normalized (lowercase) form
    ///
    /// A valid name starts with a letter or underscore and continues with
    /// letters, digits or underscores.
    pub fn validate_and_normalize_repo_name(name: &str) -> Result<String> {
        let mut chars = name.chars();
        let valid = match chars.next() {
            Some(first) => {
                (first.is_alphabetic() || first == '_')
                    && chars.all(|c| c.is_alphanumeric() || c == '_')
            }
            None => false,
        };

        if !valid {
            return Err(RepoError::InvalidRepoName {
                name: name.to_string(),
            });
        }
        Ok(name.to_lowercase())
    }

    pub fn does_repo_exist(&self, name: &str) -> bool {
        self.repos
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Claim a name for an add; fails if it is taken or being added
    fn reserve(&self, name: &str) -> Result<Reservation<'_>> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if self.does_repo_exist(name) || pending.contains(name) {
            return Err(RepoError::ExistingRepo {
                name: name.to_string(),
            });
        }
        pending.insert(name.to_string());

        Ok(Reservation {
            pending: &self.pending,
            name: name.to_string(),
        })
    }

    /// Claim an existing repo's name for a delete
    fn reserve_existing(&self, name: &str) -> Result<Reservation<'_>> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.does_repo_exist(name) || pending.contains(name) {
            return Err(RepoError::MissingRepo {
                name: name.to_string(),
            });
        }
        pending.insert(name.to_string());

        Ok(Reservation {
            pending: &self.pending,
            name: name.to_string(),
        })
    }

    fn insert(&self, repo: Arc<dyn Repo>) {
        self.repos
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(repo.name().to_string(), repo);
    }

    // ============ Adding / Removing ============

    /// Register a local folder repository (`<repos_folder>/<name>` by default)
    pub async fn add_folder_repo(
        &self,
        name: &str,
        path: Option<PathBuf>,
    ) -> Result<Arc<dyn Repo>> {
        let name = Self::validate_and_normalize_repo_name(name)?;
        let _reservation = self.reserve(&name)?;

        let folder = path.unwrap_or_else(|| self.repos_folder.join(&name));
        let repo = FolderRepo::new(&name, folder);
        repo.populate()?;

        let repo: Arc<dyn Repo> = Arc::new(repo);
        self.insert(Arc::clone(&repo));
        Ok(repo)
    }

    /// Clone and register a git repository
    ///
    /// A GitHub or GitLab `/tree/<branch>` URL selects that branch unless a
    /// branch is given explicitly.
    pub async fn add_git_repo(
        &self,
        name: &str,
        url: &str,
        branch: Option<&str>,
    ) -> Result<Arc<dyn Repo>> {
        let name = Self::validate_and_normalize_repo_name(name)?;
        let _reservation = self.reserve(&name)?;

        let (url, branch) = Self::parse_url(url, branch);
        let folder = self.repos_folder.join(&name);
        let existed = folder.exists();

        let repo = GitRepo::new(
            &name,
            &folder,
            Some(url),
            branch,
            Arc::clone(&self.runner),
        );

        if let Err(e) = repo.clone_repo().await {
            if !existed && folder.exists() {
                if let Err(cleanup) = std::fs::remove_dir_all(&folder) {
                    tracing::warn!(
                        "Failed to clean up {} after clone error: {}",
                        folder.display(),
                        cleanup
                    );
                }
            }
            return Err(e);
        }

        let repo: Arc<dyn Repo> = Arc::new(repo);
        self.insert(Arc::clone(&repo));
        Ok(repo)
    }

    pub fn get_repo(&self, name: &str) -> Option<Arc<dyn Repo>> {
        self.repos
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Names of every repository, sorted
    pub fn get_all_repo_names(&self) -> Vec<String> {
        self.repos
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Every repository, sorted by name
    pub fn get_all_repos(&self) -> Vec<Arc<dyn Repo>> {
        self.repos
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Delete a repository's files and forget it
    pub async fn delete_repo(&self, name: &str) -> Result<()> {
        let _reservation = self.reserve_existing(name)?;
        let repo = self.get_repo(name).ok_or_else(|| RepoError::MissingRepo {
            name: name.to_string(),
        })?;

        repo.delete().await?;

        self.repos
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        Ok(())
    }

    // ============ Updating ============

    pub async fn update_repo(&self, name: &str) -> Result<Option<UpdateResult>> {
        let repo = self.get_repo(name).ok_or_else(|| RepoError::MissingRepo {
            name: name.to_string(),
        })?;
        repo.update().await
    }

    /// Update every repository concurrently
    ///
    /// Only repositories that changed or failed appear in the result. A
    /// failure is wrapped with its repository name and never aborts the
    /// batch. Repositories that cannot be updated are skipped.
    pub async fn update_all_repos(&self) -> BTreeMap<String, Result<UpdateResult>> {
        let repos = self.get_all_repos();

        let outcomes = join_all(repos.iter().map(|repo| async move {
            (repo.name().to_string(), repo.update().await)
        }))
        .await;

        let mut results = BTreeMap::new();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(Some(result)) => {
                    results.insert(name, Ok(result));
                }
                Ok(None) => {}
                Err(e) if e.is_unsupported() => {
                    tracing::debug!("Skipping update of repo {}: {}", name, e);
                }
                Err(e) => {
                    tracing::warn!("Failed to update repo {}: {}", name, e);
                    let wrapped = RepoError::update(&name, e);
                    results.insert(name, Err(wrapped));
                }
            }
        }
        results
    }

    // ============ Loading ============

    /// Rebuild the repository set from the repos folder
    ///
    /// Folders with a `.git` directory load as git repositories. Folders that
    /// fail to load are logged and skipped. Returns the loaded names.
    pub async fn load_repos(&self) -> Result<Vec<String>> {
        std::fs::create_dir_all(&self.repos_folder)?;

        let mut folders: Vec<PathBuf> = std::fs::read_dir(&self.repos_folder)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        folders.sort();

        let mut loaded: BTreeMap<String, Arc<dyn Repo>> = BTreeMap::new();
        for folder in folders {
            let repo: Result<Arc<dyn Repo>> = if is_path_git_repo(&folder) {
                GitRepo::from_folder(&folder, Arc::clone(&self.runner))
                    .await
                    .map(|r| Arc::new(r) as Arc<dyn Repo>)
            } else {
                FolderRepo::from_folder(&folder).map(|r| Arc::new(r) as Arc<dyn Repo>)
            };

            match repo {
                Ok(repo) => {
                    loaded.insert(repo.name().to_string(), repo);
                }
                Err(e) => {
                    tracing::warn!("Skipping repo folder {}: {}", folder.display(), e);
                }
            }
        }

        let names = loaded.keys().cloned().collect();
        *self.repos.write().unwrap_or_else(PoisonError::into_inner) = loaded;
        Ok(names)
    }

    /// Split a GitHub/GitLab tree URL into the repository URL and branch
    ///
    /// An explicitly given branch always wins.
    pub fn parse_url(url: &str, branch: Option<&str>) -> (String, Option<String>) {
        let mut url = url.to_string();
        let mut branch = branch.map(str::to_string);

        if GITHUB_OR_GITLAB_RE.is_match(&url) {
            if let Some(caps) = TREE_URL_RE.captures(&url) {
                if branch.is_none() {
                    branch = Some(caps["branch"].to_string());
                }
                if let Some(tree) = caps.name("tree") {
                    url.truncate(tree.start());
                }
            }
        }

        (url, branch)
    }

    // ============ pip ============

    fn is_venv(&self, force_venv: Option<bool>) -> bool {
        force_venv
            .or(self.force_venv)
            .unwrap_or_else(|| std::env::var_os("VIRTUAL_ENV").is_some())
    }

    async fn run_pip(&self, argv: Vec<String>, env: Vec<(String, String)>) -> Result<ProcessOutput> {
        let _guard = self.pip_lock.lock().await;
        self.runner.run(&argv, &env).await
    }

    /// Install requirements with pip
    ///
    /// Outside a virtualenv packages go to the lib directory (`-t`). Returns
    /// whether pip succeeded; an empty list is a success.
    pub async fn pip_install(&self, requirements: &[String], force_venv: Option<bool>) -> Result<bool> {
        if requirements.is_empty() {
            return Ok(true);
        }

        let argv = if self.is_venv(force_venv) {
            COMMANDS.pip_install_no_target.format(
                &FormatArgs::new()
                    .kwarg("python", self.python.as_str())
                    .kwarg_list("reqs", requirements.iter().cloned()),
            )?
        } else {
            COMMANDS.pip_install.format(
                &FormatArgs::new()
                    .kwarg("python", self.python.as_str())
                    .kwarg("target_dir", self.lib_path.to_string_lossy())
                    .kwarg_list("reqs", requirements.iter().cloned()),
            )?
        };

        let output = self.run_pip(argv, Vec::new()).await?;
        if output.success() {
            return Ok(true);
        }

        tracing::error!(
            "Error while installing requirements: {}",
            requirements.join(", ")
        );
        Ok(false)
    }

    /// Installed version of each package (`None` when not installed)
    ///
    /// Outside a virtualenv the lib directory is put on `PYTHONPATH` so
    /// packages installed there are found.
    pub async fn pip_show(
        &self,
        packages: &[String],
        force_venv: Option<bool>,
    ) -> Result<BTreeMap<String, Option<String>>> {
        if packages.is_empty() {
            return Ok(BTreeMap::new());
        }

        let packages: BTreeSet<&String> = packages.iter().collect();
        let env = if self.is_venv(force_venv) {
            Vec::new()
        } else {
            vec![(
                "PYTHONPATH".to_string(),
                self.lib_path.to_string_lossy().into_owned(),
            )]
        };

        let argv = COMMANDS.pip_show.format(
            &FormatArgs::new()
                .kwarg("python", self.python.as_str())
                .kwarg_list("packages", packages.iter().map(|p| p.as_str())),
        )?;

        let output = self.run_pip(argv, env).await?;
        // Missing packages give a non-zero exit but the found ones are still listed
        if !output.success() && output.stdout.trim().is_empty() && !output.stderr.contains("not found") {
            return Err(RepoError::PipError {
                message: format!("pip show exited with {}: {}", output.status, output.stderr.trim()),
            });
        }
        let versions = parse_pip_show(&output.stdout);

        Ok(packages
            .into_iter()
            .map(|p| (p.clone(), versions.get(&p.to_lowercase()).cloned()))
            .collect())
    }

    /// Install a module's pip requirements
    pub async fn install_requirements(&self, module: &Installable) -> Result<bool> {
        self.pip_install(&module.info.requirements, None).await
    }

    /// Version of the configured Python interpreter
    pub async fn python_version(&self) -> Result<semver::Version> {
        let argv = COMMANDS
            .python_version
            .format(&FormatArgs::new().kwarg("python", self.python.as_str()))?;
        let output = self.runner.run(&argv, &[]).await?;

        if !output.success() {
            return Err(RepoError::Other(format!(
                "{} --version failed: {}",
                self.python,
                output.stderr.trim()
            )));
        }

        // Older interpreters print the version on stderr
        let text = if output.stdout.trim().is_empty() {
            &output.stderr
        } else {
            &output.stdout
        };
        cogsmith_core::parse_loose_version(text).ok_or_else(|| {
            RepoError::Other(format!("could not parse python version from '{}'", text.trim()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ScriptedRunner;
    use tempfile::TempDir;

    fn manager(dir: &TempDir, runner: &ScriptedRunner) -> RepoManager {
        RepoManager::new(dir.path().join("repos"), Arc::new(runner.clone()))
            .with_lib_path(dir.path().join("lib"))
            .with_python("python3")
    }

    fn script_clone(runner: &ScriptedRunner) {
        runner.respond_with(&["git", "clone"], |argv| {
            let folder = PathBuf::from(argv.last().unwrap());
            std::fs::create_dir_all(folder.join(".git")).unwrap();
            ProcessOutput::ok("")
        });
        runner.respond(&["git", "rev-parse"], ProcessOutput::ok("master\n"));
    }

    #[test]
    fn test_validate_and_normalize_repo_name() {
        assert_eq!(
            RepoManager::validate_and_normalize_repo_name("Squid_Plugins2").unwrap(),
            "squid_plugins2"
        );
        assert_eq!(
            RepoManager::validate_and_normalize_repo_name("_private").unwrap(),
            "_private"
        );

        for bad in ["", "2fast", "invalid!repo:name", "http://test.com", "has space", "dash-ed"] {
            assert!(matches!(
                RepoManager::validate_and_normalize_repo_name(bad),
                Err(RepoError::InvalidRepoName { .. })
            ));
        }
    }

    #[test]
    fn test_tree_url_parse() {
        let cases = [
            (
                ("https://github.com/Tobotimus/Tobo-Cogs", None),
                ("https://github.com/Tobotimus/Tobo-Cogs", None),
            ),
            (
                ("https://github.com/Tobotimus/Tobo-Cogs", Some("V3")),
                ("https://github.com/Tobotimus/Tobo-Cogs", Some("V3")),
            ),
            (
                ("https://github.com/Tobotimus/Tobo-Cogs/tree/V3", None),
                ("https://github.com/Tobotimus/Tobo-Cogs", Some("V3")),
            ),
            (
                ("https://github.com/Tobotimus/Tobo-Cogs/tree/V3", Some("V4")),
                ("https://github.com/Tobotimus/Tobo-Cogs", Some("V4")),
            ),
            (
                ("https://gitlab.com/someone/cogs/tree/dev", None),
                ("https://gitlab.com/someone/cogs", Some("dev")),
            ),
            (
                ("https://example.com/someone/cogs/tree/dev", None),
                ("https://example.com/someone/cogs/tree/dev", None),
            ),
        ];

        for ((url, branch), (expected_url, expected_branch)) in cases {
            assert_eq!(
                RepoManager::parse_url(url, branch),
                (expected_url.to_string(), expected_branch.map(str::to_string))
            );
        }
    }

    #[tokio::test]
    async fn test_add_remove_git_repo() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        script_clone(&runner);
        let manager = manager(&dir, &runner);

        let before = manager.get_all_repo_names();
        let repo = manager
            .add_git_repo("squid", "https://github.com/tekulvw/Squid-Plugins", Some("rewrite_cogs"))
            .await
            .unwrap();

        assert!(repo.available_modules().is_empty());
        assert!(manager.does_repo_exist("squid"));
        assert_eq!(repo.branch().as_deref(), Some("rewrite_cogs"));

        manager.delete_repo("squid").await.unwrap();
        assert!(manager.get_repo("squid").is_none());
        assert_eq!(manager.get_all_repo_names(), before);
        assert!(!dir.path().join("repos").join("squid").exists());
    }

    #[tokio::test]
    async fn test_add_remove_folder_repo() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        let manager = manager(&dir, &runner);

        let repo = manager.add_folder_repo("test_add_del", None).await.unwrap();
        assert!(repo.available_modules().is_empty());
        assert!(manager.get_repo("test_add_del").is_some());

        manager.delete_repo("test_add_del").await.unwrap();
        assert!(manager.get_repo("test_add_del").is_none());
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_is_exclusive_per_name() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        let manager = manager(&dir, &runner);
        manager.add_folder_repo("busy", None).await.unwrap();

        let held = manager.reserve_existing("busy").unwrap();
        assert!(matches!(
            manager.delete_repo("busy").await,
            Err(RepoError::MissingRepo { .. })
        ));
        assert!(matches!(
            manager.add_folder_repo("busy", None).await,
            Err(RepoError::ExistingRepo { .. })
        ));
        assert!(manager.get_repo("busy").is_some());

        drop(held);
        manager.delete_repo("busy").await.unwrap();
        assert!(manager.get_repo("busy").is_none());
        assert!(matches!(
            manager.delete_repo("busy").await,
            Err(RepoError::MissingRepo { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_names_never_run_git() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        script_clone(&runner);
        let manager = manager(&dir, &runner);

        assert!(matches!(
            manager.add_git_repo("http://test.com", "test_dup_1", None).await,
            Err(RepoError::InvalidRepoName { .. })
        ));
        assert!(matches!(
            manager.add_folder_repo("invalid!repo:name", None).await,
            Err(RepoError::InvalidRepoName { .. })
        ));
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_existing_repo() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        script_clone(&runner);
        let manager = manager(&dir, &runner);

        manager
            .add_git_repo("test_dup_2", "http://test.com", Some("master"))
            .await
            .unwrap();
        let calls = runner.call_count();

        assert!(matches!(
            manager
                .add_git_repo("Test_Dup_2", "http://test.com", Some("master"))
                .await,
            Err(RepoError::ExistingRepo { .. })
        ));
        assert_eq!(runner.call_count(), calls);
    }

    #[tokio::test]
    async fn test_failed_clone_cleans_up() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        runner.respond_with(&["git", "clone"], |argv| {
            std::fs::create_dir_all(argv.last().unwrap()).unwrap();
            ProcessOutput::failed(128, "fatal: repository not found")
        });
        let manager = manager(&dir, &runner);

        assert!(matches!(
            manager.add_git_repo("gone", "https://github.com/x/y", None).await,
            Err(RepoError::CloningError { .. })
        ));
        assert!(!manager.does_repo_exist("gone"));
        assert!(!dir.path().join("repos").join("gone").exists());

        // The name is free again
        script_clone(&runner);
        manager
            .add_git_repo("gone", "https://github.com/x/y", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_load_repos() {
        let dir = TempDir::new().unwrap();
        let repos = dir.path().join("repos");
        std::fs::create_dir_all(repos.join("plain").join("cog_a")).unwrap();
        std::fs::write(repos.join("plain").join("cog_a").join("__init__.py"), "").unwrap();
        std::fs::create_dir_all(repos.join("cloned").join(".git")).unwrap();
        std::fs::create_dir_all(repos.join("broken").join(".git")).unwrap();
        std::fs::write(repos.join("stray.txt"), "").unwrap();

        let runner = ScriptedRunner::new();
        runner.respond(&["git", "rev-parse"], ProcessOutput::ok("main\n"));
        runner.respond(&["git", "config"], ProcessOutput::ok("https://example.com/c.git\n"));
        let broken = repos.join("broken").to_string_lossy().into_owned();
        runner.respond(&["git", "-C", broken.as_str(), "config"], ProcessOutput::failed(1, ""));

        let manager = manager(&dir, &runner);
        let names = manager.load_repos().await.unwrap();

        assert_eq!(names, vec!["cloned".to_string(), "plain".to_string()]);
        let cloned = manager.get_repo("cloned").unwrap();
        assert_eq!(cloned.kind(), crate::repo::RepoKind::Git);
        assert_eq!(cloned.url().as_deref(), Some("https://example.com/c.git"));
        let plain = manager.get_repo("plain").unwrap();
        assert!(plain.find_cog("cog_a").is_some());
    }

    #[tokio::test]
    async fn test_update_all_repos_isolates_failures() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        script_clone(&runner);
        let manager = manager(&dir, &runner);

        manager.add_git_repo("good", "https://github.com/a/good", None).await.unwrap();
        manager.add_git_repo("bad", "https://github.com/a/bad", None).await.unwrap();
        manager.add_git_repo("same", "https://github.com/a/same", None).await.unwrap();
        manager.add_folder_repo("local", None).await.unwrap();

        let path_of = |name: &str| dir.path().join("repos").join(name).to_string_lossy().into_owned();
        let good = path_of("good");
        let bad = path_of("bad");

        // "good" reports a new commit after pulling, "same" never changes
        runner.respond(&["git", "rev-list"], ProcessOutput::ok("c1\n"));
        runner.respond_with(&["git", "-C", good.as_str(), "pull"], {
            let runner = runner.clone();
            let good = good.clone();
            move |_| {
                runner.respond(&["git", "-C", good.as_str(), "rev-list"], ProcessOutput::ok("c2\n"));
                ProcessOutput::ok("")
            }
        });
        runner.respond(&["git", "-C", bad.as_str(), "pull"], ProcessOutput::failed(1, "diverged"));

        let results = manager.update_all_repos().await;

        assert_eq!(results.len(), 2);
        let good_result = results["good"].as_ref().unwrap();
        assert_eq!(good_result.new_version.as_deref(), Some("c2"));
        match &results["bad"] {
            Err(RepoError::Update { repo, source }) => {
                assert_eq!(repo, "bad");
                assert!(matches!(**source, RepoError::GitUpdateError { .. }));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pip_install_target_and_venv() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        let manager = manager(&dir, &runner);

        assert!(manager.pip_install(&[], None).await.unwrap());
        assert_eq!(runner.call_count(), 0);

        let reqs = vec!["tabulate".to_string(), "aiorwlock==0.5.0".to_string()];
        assert!(manager.pip_install(&reqs, Some(false)).await.unwrap());
        assert!(manager.pip_install(&reqs, Some(true)).await.unwrap());

        let calls = runner.calls();
        let lib = dir.path().join("lib").to_string_lossy().into_owned();
        assert_eq!(
            calls[0].argv,
            vec!["python3", "-m", "pip", "install", "-U", "-t", lib.as_str(), "tabulate", "aiorwlock==0.5.0"]
        );
        assert_eq!(
            calls[1].argv,
            vec![
                "python3",
                "-m",
                "pip",
                "--disable-pip-version-check",
                "install",
                "-U",
                "tabulate",
                "aiorwlock==0.5.0"
            ]
        );

        runner.respond(&["pip", "install"], ProcessOutput::failed(1, "no such package"));
        assert!(!manager.pip_install(&reqs, Some(true)).await.unwrap());
    }

    #[tokio::test]
    async fn test_pip_show() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        runner.respond(
            &["pip", "show"],
            ProcessOutput::ok("Name: PyYAML\nVersion: 6.0.1\n---\nName: aiohttp\nVersion: 3.9.1\n"),
        );
        let manager = manager(&dir, &runner);

        let packages = vec![
            "pyyaml".to_string(),
            "aiohttp".to_string(),
            "missing".to_string(),
            "pyyaml".to_string(),
        ];
        let versions = manager.pip_show(&packages, Some(false)).await.unwrap();

        assert_eq!(versions.len(), 3);
        assert_eq!(versions["pyyaml"].as_deref(), Some("6.0.1"));
        assert_eq!(versions["aiohttp"].as_deref(), Some("3.9.1"));
        assert_eq!(versions["missing"], None);

        let call = &runner.calls()[0];
        assert_eq!(call.env[0].0, "PYTHONPATH");

        runner.respond(
            &["pip", "show"],
            ProcessOutput::failed(1, "WARNING: Package(s) not found: missing"),
        );
        let versions = manager.pip_show(&packages[2..3], Some(true)).await.unwrap();
        assert_eq!(versions["missing"], None);

        runner.respond(&["pip", "show"], ProcessOutput::failed(1, "No module named pip"));
        assert!(matches!(
            manager.pip_show(&packages, Some(true)).await,
            Err(RepoError::PipError { .. })
        ));
    }

    #[tokio::test]
    async fn test_python_version() {
        let dir = TempDir::new().unwrap();
        let runner = ScriptedRunner::new();
        runner.respond(&["python3", "--version"], ProcessOutput::ok("Python 3.11.4\n"));
        let manager = manager(&dir, &runner);

        assert_eq!(
            manager.python_version().await.unwrap(),
            semver::Version::new(3, 11, 4)
        );
    }
}
