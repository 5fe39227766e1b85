//! findcog command - find the cog that provides a command

use cogsmith_repo::Downloader;

use crate::error::{CliError, Result};

pub async fn run(downloader: &Downloader, command: &str) -> Result<()> {
    match downloader.find_cog(command).await? {
        Some(message) => {
            println!("{}", message);
            Ok(())
        }
        None => Err(CliError::input_with_help(
            "That command doesn't seem to exist.",
            "Commands are read from the index file set as commandIndex in the config",
        )),
    }
}
