//! cogsmith Repository Management
//!
//! This crate manages the repositories cogs are installed from:
//!
//! - **Git repositories**: cloned from a remote, updated with a hard reset
//!   and fast-forward pull
//! - **Folder repositories**: local folders, never updated
//!
//! ## Key Features
//!
//! - **Update tracking**: every update reports new, updated and removed modules
//! - **Shell-free subprocesses**: git and pip commands are built from
//!   templates into argument vectors
//! - **Isolated failures**: one repository failing to update never aborts
//!   the others
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cogsmith_repo::{RepoManager, SystemRunner};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = RepoManager::new("/data/repos", Arc::new(SystemRunner::new(4)));
//! manager.load_repos().await?;
//!
//! let repo = manager
//!     .add_git_repo("squid", "https://github.com/tekulvw/Squid-Plugins", None)
//!     .await?;
//! for cog in repo.available_cogs() {
//!     println!("{}", cog.name);
//! }
//!
//! for (name, result) in manager.update_all_repos().await {
//!     match result {
//!         Ok(update) => println!("{}: {} modules updated", name, update.updated.len()),
//!         Err(e) => eprintln!("{}", e),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod config;
pub mod downloader;
pub mod error;
pub mod folder;
pub mod git;
pub mod lookup;
pub mod manager;
pub mod pip;
pub mod repo;
pub mod runner;
pub mod tracker;

// Re-exports for convenience
pub use command::{COMMANDS, CommandTemplate, Commands, FieldValue, FormatArgs, TemplateError};
pub use config::DownloaderConfig;
pub use downloader::{Downloader, InstallOutcome, UninstallOutcome, UpdateReport};
pub use error::{RepoError, Result};
pub use folder::{FolderRepo, is_path_git_repo};
pub use git::GitRepo;
pub use lookup::{CommandLookup, CommandOwner, IndexFileLookup};
pub use manager::RepoManager;
pub use pip::{parse_pip_show, requirement_name};
pub use repo::{Repo, RepoKind};
pub use runner::{ProcessOutput, ProcessRunner, RecordedCall, ScriptedRunner, SystemRunner};
pub use tracker::{ModuleLists, UpdateResult, UpdateTracker};
