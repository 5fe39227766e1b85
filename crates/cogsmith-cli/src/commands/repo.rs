//! Repository management commands

use console::style;
use std::io::{self, BufRead, Write};

use cogsmith_repo::Downloader;

use crate::display;
use crate::error::Result;

const AGREEMENT: &str = "You're about to add a 3rd party repository. The creator of Red \
and its community have no responsibility for any potential damage that the content of \
3rd party repositories might cause.\n\nBy typing 'I agree' you declare that you have read \
and fully understand the above message.";

/// Ask the user to accept the third party repository agreement
fn install_agreement(input: &mut impl BufRead) -> Result<bool> {
    println!("{}", style("Warning").yellow().bold());
    println!("{}", AGREEMENT);
    print!("> ");
    io::stdout().flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("i agree"))
}

/// Add a git repository
pub async fn add(
    downloader: &Downloader,
    name: &str,
    url: &str,
    branch: Option<&str>,
    agreed: bool,
) -> Result<()> {
    if !agreed && !install_agreement(&mut io::stdin().lock())? {
        println!("Not adding repo.");
        return Ok(());
    }

    let repo = downloader.manager().add_git_repo(name, url, branch).await?;

    let message = format!("Repo `{}` successfully added.", repo.name());
    println!(
        "{}",
        display::with_install_msg(message, repo.info().install_msg.as_deref())
    );
    Ok(())
}

/// Create a local folder repository
///
/// Cogs are copied into the printed folder by hand; nothing is ever pulled.
pub async fn add_folder(downloader: &Downloader, name: &str) -> Result<()> {
    let repo = downloader.manager().add_folder_repo(name, None).await?;

    println!("Repo `{}` successfully added.", repo.name());
    println!(
        "{} Place cog folders in {}",
        style("→").blue(),
        repo.folder_path().display()
    );
    Ok(())
}

/// Delete a repository and its files
pub async fn delete(downloader: &Downloader, name: &str) -> Result<()> {
    downloader.manager().delete_repo(name).await?;
    println!("The `{}` repo has been successfully deleted.", name);
    Ok(())
}

/// List known repositories
pub async fn list(downloader: &Downloader) -> Result<()> {
    match display::repo_list(&downloader.manager().get_all_repos()) {
        Some(listing) => println!("{}", listing),
        None => println!("No repos found."),
    }
    Ok(())
}

/// Show a repository's description
pub async fn info(downloader: &Downloader, name: &str) -> Result<()> {
    let repo = downloader
        .manager()
        .get_repo(name)
        .ok_or_else(|| cogsmith_repo::RepoError::MissingRepo {
            name: name.to_string(),
        })?;

    println!("{}", display::repo_info(repo.as_ref()));
    Ok(())
}
