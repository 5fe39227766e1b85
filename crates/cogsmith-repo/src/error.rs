//! Error types for repository operations

use thiserror::Error;

use crate::command::TemplateError;

/// Repository operation errors
#[derive(Debug, Error)]
pub enum RepoError {
    // ============ Naming / Lookup Errors ============
    #[error("Invalid repository name: '{name}' (only letters, digits and underscores, not starting with a digit)")]
    InvalidRepoName { name: String },

    #[error("Repository already exists: {name}")]
    ExistingRepo { name: String },

    #[error("A git repository already exists at {path}")]
    ExistingGitRepo { path: String },

    #[error("Repository not found: {name}")]
    MissingRepo { name: String },

    #[error("A git repository does not exist at path: {path}")]
    MissingGitRepo { path: String },

    #[error("Module not available: {message}")]
    MissingModule { message: String },

    // ============ Git Errors ============
    #[error("Error when running git clone for {url}")]
    CloningError { url: String, stderr: String },

    #[error("Unable to determine commit hash for repo at {path}")]
    CurrentHashError { path: String },

    #[error("Hard reset failed for the repo located at path: {path}")]
    HardResetError { path: String },

    #[error("Git pull returned a non zero exit code for the repo located at path: {path}")]
    GitUpdateError { path: String },

    #[error("Git diff failed for repo at path: {path}")]
    GitDiffError { path: String },

    #[error("Git error: {message}")]
    Git { message: String },

    // ============ Install Errors ============
    #[error("pip failed: {message}")]
    PipError { message: String },

    #[error("Installation failed: {message}")]
    InstallationError { message: String },

    // ============ Update Errors ============
    #[error("{operation} is not supported by this repository type")]
    Unsupported { operation: &'static str },

    #[error("Failed to update repository '{repo}': {source}")]
    Update {
        repo: String,
        #[source]
        source: Box<RepoError>,
    },

    // ============ Process Errors ============
    #[error("Failed to run '{program}': {message}")]
    Spawn { program: String, message: String },

    #[error(transparent)]
    Template(#[from] TemplateError),

    // ============ Config / IO Errors ============
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error(transparent)]
    Core(#[from] cogsmith_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}

impl RepoError {
    /// Wrap an error with the repository it came from
    pub fn update(repo: impl Into<String>, source: RepoError) -> Self {
        RepoError::Update {
            repo: repo.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error only signals an unsupported operation
    pub fn is_unsupported(&self) -> bool {
        matches!(self, RepoError::Unsupported { .. })
    }

    /// Whether this error is a git subprocess failure
    pub fn is_git_failure(&self) -> bool {
        matches!(
            self,
            RepoError::CloningError { .. }
                | RepoError::CurrentHashError { .. }
                | RepoError::HardResetError { .. }
                | RepoError::GitUpdateError { .. }
                | RepoError::GitDiffError { .. }
                | RepoError::Git { .. }
        )
    }
}

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepoError>;

impl From<serde_yaml::Error> for RepoError {
    fn from(e: serde_yaml::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(e: serde_json::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}
