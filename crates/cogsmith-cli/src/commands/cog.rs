//! Cog commands - install, uninstall, update and inspect cogs

use console::style;
use std::collections::BTreeMap;

use cogsmith_repo::{Downloader, InstallOutcome, RepoError, UninstallOutcome};

use crate::display;
use crate::error::{CliError, Result};

fn missing_repo(name: &str) -> CliError {
    RepoError::MissingRepo {
        name: name.to_string(),
    }
    .into()
}

/// Install a cog from a repository
pub async fn install(downloader: &Downloader, repo_name: &str, cog_name: &str) -> Result<()> {
    match downloader.install_cog(repo_name, cog_name).await? {
        InstallOutcome::Installed {
            cog,
            path,
            failed_libraries,
        } => {
            tracing::debug!("Installed {} to {}", cog.name, path.display());

            let message = format!("Cog `{}` successfully installed.", cog_name);
            println!(
                "{}",
                display::with_install_msg(message, cog.info.install_msg.as_deref())
            );

            if !failed_libraries.is_empty() {
                let names: Vec<&str> = failed_libraries.iter().map(|l| l.name.as_str()).collect();
                eprintln!(
                    "{} Failed to install shared libraries: {}",
                    style("⚠").yellow(),
                    names.join(", ")
                );
            }
            Ok(())
        }
        InstallOutcome::NotFound => Err(CliError::input(format!(
            "There is no cog by the name of `{}` in the `{}` repo.",
            cog_name, repo_name
        ))),
        InstallOutcome::PythonTooOld { required } => Err(CliError::install(format!(
            "This cog requires at least python version {}, aborting install.",
            required
        ))),
        InstallOutcome::RequirementsFailed { requirements } => Err(CliError::install(format!(
            "Failed to install the required libraries for `{}`: `{}`",
            cog_name,
            requirements.join(", ")
        ))),
    }
}

/// Uninstall a previously installed cog
pub async fn uninstall(downloader: &Downloader, cog_name: &str) -> Result<()> {
    match downloader.uninstall_cog(cog_name).await? {
        UninstallOutcome::Removed => {
            println!("`{}` was successfully removed.", cog_name);
            Ok(())
        }
        UninstallOutcome::FilesMissing => Err(CliError::install(
            "That cog was installed but can no longer be located. You may need to remove it's \
             files manually if it is still usable.",
        )),
        UninstallOutcome::NotInstalled => Err(CliError::input(format!(
            "`{}` is not installed.",
            cog_name
        ))),
    }
}

/// Update one installed cog, or all of them
pub async fn update(downloader: &Downloader, cog_name: Option<&str>, show_files: bool) -> Result<()> {
    if let Some(name) = cog_name {
        if downloader.is_installed(name).await.is_none() {
            return Err(CliError::input(format!("`{}` is not installed.", name)));
        }
    }

    let report = downloader.update_cogs(cog_name).await?;

    for problem in display::update_problems(&report) {
        eprintln!("{} {}", style("⚠").yellow(), problem);
    }

    if show_files {
        for update in report.updates.values() {
            match downloader.changed_files(update).await {
                Ok(files) => println!("{}\n", display::changed_files(&update.repo_name, &files)),
                Err(e) => tracing::warn!(
                    "Could not list changed files for {}: {}",
                    update.repo_name,
                    e
                ),
            }
        }
    }

    println!("{}", display::update_summary(&report, cog_name));
    Ok(())
}

/// List the cogs of a repository
pub async fn list(downloader: &Downloader, repo_name: &str) -> Result<()> {
    let repo = downloader
        .manager()
        .get_repo(repo_name)
        .ok_or_else(|| missing_repo(repo_name))?;

    let installed: Vec<_> = downloader
        .installed_cogs()
        .await
        .into_iter()
        .filter(|c| c.repo_name == repo.name())
        .collect();

    println!(
        "{}",
        display::cog_list(repo.name(), &repo.available_cogs(), &installed)
    );
    Ok(())
}

/// Show information about one cog
pub async fn info(downloader: &Downloader, repo_name: &str, cog_name: &str) -> Result<()> {
    let repo = downloader
        .manager()
        .get_repo(repo_name)
        .ok_or_else(|| missing_repo(repo_name))?;

    let cog = repo.find_cog(cog_name).ok_or_else(|| {
        CliError::input(format!(
            "There is no cog `{}` in the repo `{}`",
            cog_name, repo_name
        ))
    })?;

    let versions = if cog.info.requirements.is_empty() {
        BTreeMap::new()
    } else {
        downloader.requirement_versions(&cog).await.unwrap_or_else(|e| {
            tracing::warn!("Could not look up installed requirements: {}", e);
            BTreeMap::new()
        })
    };

    println!("{}", display::cog_info(&cog, &versions));
    Ok(())
}
