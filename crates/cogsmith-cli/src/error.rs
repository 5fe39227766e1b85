//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes. Errors the user can act on carry
//! the same wording the downloader has always replied with.

use cogsmith_repo::RepoError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// User provided invalid input
    #[error("{message}")]
    #[diagnostic(code(cogsmith::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Unknown, duplicate or unreadable repository
    #[error("{message}")]
    #[diagnostic(code(cogsmith::cli::repo))]
    Repo {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// A git command failed
    #[error("{message}")]
    #[diagnostic(code(cogsmith::cli::git))]
    Git {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Installing a cog, library or requirement failed
    #[error("{message}")]
    #[diagnostic(code(cogsmith::cli::install))]
    Install {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Configuration could not be loaded
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(cogsmith::cli::config),
        help("Check the file passed with --config or COGSMITH_CONFIG")
    )]
    Config { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(cogsmith::cli::io))]
    Io { message: String },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(cogsmith::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input { .. } => exit_codes::USAGE_ERROR,
            CliError::Repo { .. } => exit_codes::REPO_ERROR,
            CliError::Git { .. } => exit_codes::GIT_ERROR,
            CliError::Install { .. } => exit_codes::INSTALL_ERROR,
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an input error (user provided invalid input)
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: None,
        }
    }

    /// Create an input error with help text
    pub fn input_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a repository error
    pub fn repo(message: impl Into<String>) -> Self {
        Self::Repo {
            message: message.into(),
            help: None,
        }
    }

    /// Create an install error
    pub fn install(message: impl Into<String>) -> Self {
        Self::Install {
            message: message.into(),
            help: None,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<RepoError> for CliError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::InvalidRepoName { name } => CliError::input_with_help(
                format!("`{}` is not a valid repository name.", name),
                "Names start with a letter or underscore and contain only letters, digits and underscores",
            ),
            RepoError::ExistingRepo { .. } | RepoError::ExistingGitRepo { .. } => {
                CliError::repo("That repo has already been added under another name.")
            }
            RepoError::MissingRepo { name } => CliError::Repo {
                message: format!("Repo by the name {} does not exist.", name),
                help: Some("List known repos with `cogsmith repo list`".to_string()),
            },
            RepoError::CloningError { stderr, .. } => CliError::Git {
                message: "Something went wrong during the cloning process.".to_string(),
                help: (!stderr.is_empty()).then_some(stderr),
            },
            RepoError::MissingModule { message } => CliError::input(message),
            RepoError::InstallationError { message } | RepoError::PipError { message } => {
                CliError::install(message)
            }
            RepoError::InvalidConfig { message } => CliError::config(message),
            RepoError::Io(e) => CliError::Io {
                message: e.to_string(),
            },
            RepoError::Spawn { program, message } => CliError::Internal {
                message: format!("could not run {}: {}", program, message),
            },
            e if e.is_git_failure() => CliError::Git {
                message: e.to_string(),
                help: None,
            },
            e => CliError::internal(e.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
