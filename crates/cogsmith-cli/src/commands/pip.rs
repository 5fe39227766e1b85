//! pipinstall command - install arbitrary packages with pip

use cogsmith_repo::Downloader;

use crate::error::{CliError, Result};

pub async fn run(downloader: &Downloader, packages: &[String]) -> Result<()> {
    if downloader.pip_install(packages).await? {
        println!("Libraries installed.");
        Ok(())
    } else {
        Err(CliError::install(
            "Some libraries failed to install. Please check your logs for a complete list.",
        ))
    }
}
