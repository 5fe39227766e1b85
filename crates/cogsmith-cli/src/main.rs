//! cogsmith CLI - install and update bot cogs from git and folder repositories

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cogsmith_repo::{Downloader, DownloaderConfig, SystemRunner};

mod commands;
mod display;
mod error;
mod exit_codes;

use error::{CliError, Result};

/// Environment variable holding the log filter
const LOG_ENV: &str = "COGSMITH_LOG";

#[derive(Parser)]
#[command(name = "cogsmith")]
#[command(author = "cogsmith Contributors")]
#[command(version)]
#[command(about = "Install and update bot cogs from git and folder repositories", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Configuration file
    #[arg(long, global = true, env = "COGSMITH_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory (overrides the configuration file)
    #[arg(long, global = true, env = "COGSMITH_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage repositories
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },

    /// Install, update and inspect cogs
    Cog {
        #[command(subcommand)]
        command: CogCommands,
    },

    /// Install packages with pip
    Pipinstall {
        /// Packages to install
        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// Find the cog that provides a command
    Findcog {
        /// Command name
        command: String,
    },
}

#[derive(Subcommand)]
enum RepoCommands {
    /// Clone a git repository
    Add {
        /// Repository name (letters, digits and underscores)
        name: String,

        /// Git URL
        url: String,

        /// Branch to check out (defaults to the remote's default branch)
        branch: Option<String>,

        /// Accept the third party repository agreement without prompting
        #[arg(long)]
        i_agree: bool,
    },

    /// Create a local folder repository in the repos directory
    AddFolder {
        /// Repository name
        name: String,
    },

    /// Delete a repository and its files
    Delete {
        /// Repository name
        name: String,
    },

    /// List repositories
    List,

    /// Show information about a repository
    Info {
        /// Repository name
        name: String,
    },
}

#[derive(Subcommand)]
enum CogCommands {
    /// Install a cog
    Install {
        /// Repository name
        repo: String,

        /// Cog name
        cog: String,
    },

    /// Uninstall a cog
    Uninstall {
        /// Cog name
        cog: String,
    },

    /// Update all installed cogs, or one
    Update {
        /// Cog name
        cog: Option<String>,

        /// Print the files changed in each updated repository
        #[arg(long)]
        show_files: bool,
    },

    /// List the cogs of a repository
    List {
        /// Repository name
        repo: String,
    },

    /// Show information about a cog
    Info {
        /// Repository name
        repo: String,

        /// Cog name
        cog: String,
    },
}

/// Initialize tracing on stderr
///
/// `COGSMITH_LOG` takes precedence; `--debug` raises the default level.
fn initialize_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<DownloaderConfig> {
    let config = match path {
        Some(path) if path.exists() => DownloaderConfig::load_from(path),
        Some(path) => {
            return Err(CliError::config(format!(
                "{} does not exist",
                path.display()
            )));
        }
        None => DownloaderConfig::load(),
    }
    .map_err(|e| CliError::config(e.to_string()))?;

    Ok(match data_dir {
        Some(dir) => config.with_data_dir(dir),
        None => config,
    })
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref(), cli.data_dir)?;
    tracing::debug!("Using data directory {}", config.data_dir.display());

    let runner = Arc::new(SystemRunner::new(config.threads));
    let downloader = Downloader::open(config, runner).await?;

    match cli.command {
        Commands::Repo { command } => match command {
            RepoCommands::Add {
                name,
                url,
                branch,
                i_agree,
            } => commands::repo::add(&downloader, &name, &url, branch.as_deref(), i_agree).await,
            RepoCommands::AddFolder { name } => commands::repo::add_folder(&downloader, &name).await,
            RepoCommands::Delete { name } => commands::repo::delete(&downloader, &name).await,
            RepoCommands::List => commands::repo::list(&downloader).await,
            RepoCommands::Info { name } => commands::repo::info(&downloader, &name).await,
        },

        Commands::Cog { command } => match command {
            CogCommands::Install { repo, cog } => {
                commands::cog::install(&downloader, &repo, &cog).await
            }
            CogCommands::Uninstall { cog } => commands::cog::uninstall(&downloader, &cog).await,
            CogCommands::Update { cog, show_files } => {
                commands::cog::update(&downloader, cog.as_deref(), show_files).await
            }
            CogCommands::List { repo } => commands::cog::list(&downloader, &repo).await,
            CogCommands::Info { repo, cog } => commands::cog::info(&downloader, &repo, &cog).await,
        },

        Commands::Pipinstall { packages } => commands::pip::run(&downloader, &packages).await,

        Commands::Findcog { command } => commands::findcog::run(&downloader, &command).await,
    }
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    initialize_tracing(cli.debug);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
