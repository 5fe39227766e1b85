//! Display formatting for CLI output
//!
//! Every reply is built as a plain string so it can be tested; commands
//! decide where it is printed.

use cogsmith_core::Installable;
use cogsmith_repo::{Repo, UpdateReport};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Footer printed after a list of updated cogs
pub const RELOAD_HINT: &str = "Run `[p]reload COG_NAME` to reload an updated cog.";

/// Append `---` and the manifest's install message, when there is one
pub fn with_install_msg(message: String, install_msg: Option<&str>) -> String {
    match install_msg {
        Some(extra) => format!("{}\n---\n{}", message, extra),
        None => message,
    }
}

fn entry(marker: char, name: &str, short: Option<&str>) -> String {
    match short {
        Some(short) if !short.is_empty() => format!("{} {}: {}", marker, name, short),
        _ => format!("{} {}", marker, name),
    }
}

// ============ Repos ============

/// `repo list` reply; `None` when there are no repos
pub fn repo_list(repos: &[Arc<dyn Repo>]) -> Option<String> {
    if repos.is_empty() {
        return None;
    }

    let mut sorted: Vec<&Arc<dyn Repo>> = repos.iter().collect();
    sorted.sort_by_key(|r| r.name().to_lowercase());

    let mut lines = vec!["Installed Repos:".to_string(), String::new()];
    for repo in sorted {
        let info = repo.info();
        lines.push(entry('+', repo.name(), info.short.as_deref()));
    }
    Some(lines.join("\n"))
}

/// `repo info` reply
pub fn repo_info(repo: &dyn Repo) -> String {
    let info = repo.info();
    let mut message = format!(
        "Information on {}:\n{}",
        repo.name(),
        info.description.as_deref().unwrap_or_default()
    );

    if let Some(url) = repo.url() {
        message.push_str(&format!("\n\nURL: {}", url));
        if let Some(branch) = repo.branch() {
            message.push_str(&format!("\nBranch: {}", branch));
        }
    }
    message
}

// ============ Cogs ============

/// `cog list` reply
///
/// Hidden cogs are left out of the available list; installed cogs are
/// listed separately.
pub fn cog_list(repo_name: &str, available: &[Installable], installed: &[Installable]) -> String {
    let mut cogs: Vec<&Installable> = available
        .iter()
        .filter(|c| !c.info.hidden && !installed.contains(c))
        .collect();
    cogs.sort_by(|a, b| a.name.cmp(&b.name));

    let mut installed: Vec<&Installable> = installed.iter().collect();
    installed.sort_by(|a, b| a.name.cmp(&b.name));

    let mut lines = Vec::new();
    if !cogs.is_empty() {
        lines.push("Available Cogs:".to_string());
        lines.extend(cogs.iter().map(|c| entry('+', &c.name, c.info.short.as_deref())));
    }

    if !installed.is_empty() {
        if !cogs.is_empty() {
            lines.push(String::new());
        }
        lines.push("Installed Cogs:".to_string());
        lines.extend(
            installed
                .iter()
                .map(|c| entry('-', &c.name, c.info.short.as_deref())),
        );
    }

    if lines.is_empty() {
        return format!("There are no cogs in the `{}` repo.", repo_name);
    }
    lines.join("\n")
}

/// `cog info` reply
///
/// Requirements found in `versions` are annotated with what is installed.
pub fn cog_info(cog: &Installable, versions: &BTreeMap<String, Option<String>>) -> String {
    let requirements = if cog.info.requirements.is_empty() {
        "None".to_string()
    } else {
        cog.info
            .requirements
            .iter()
            .map(|r| match versions.get(r) {
                Some(Some(version)) => format!("{} ({})", r, version),
                Some(None) => format!("{} (not installed)", r),
                None => r.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "Information on {}:\n{}\n\nRequirements: {}",
        cog.name,
        cog.info.description.as_deref().unwrap_or_default(),
        requirements
    )
}

// ============ Updates ============

/// `cog update` reply
pub fn update_summary(report: &UpdateReport, cog_name: Option<&str>) -> String {
    if report.is_up_to_date() {
        return match cog_name {
            Some(name) => format!("`{}` is already up to date.", name),
            None => "All installed cogs are already up to date.".to_string(),
        };
    }

    let mut lines = vec!["The following cogs were updated:".to_string()];
    for (repo, cogs) in &report.updated_cogs {
        lines.push(String::new());
        lines.push(format!("{}:", repo));
        lines.extend(cogs.iter().map(|c| format!("+ {}", c)));
    }
    lines.push(String::new());
    lines.push(RELOAD_HINT.to_string());
    lines.join("\n")
}

/// Problems encountered during an update, one line each
pub fn update_problems(report: &UpdateReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .errors
        .iter()
        .map(|(repo, e)| format!("Failed to update repo `{}`: {}", repo, root_cause(e)))
        .collect();

    if !report.failed_requirements.is_empty() {
        lines.push(format!(
            "Failed to install requirements: {}",
            report.failed_requirements.join(", ")
        ));
    }
    if !report.failed_cogs.is_empty() {
        lines.push(format!(
            "Failed to reinstall cogs: {}",
            report.failed_cogs.join(", ")
        ));
    }
    if !report.failed_libraries.is_empty() {
        lines.push(format!(
            "Failed to reinstall shared libraries: {}",
            report.failed_libraries.join(", ")
        ));
    }
    lines
}

fn root_cause(err: &cogsmith_repo::RepoError) -> String {
    match err {
        cogsmith_repo::RepoError::Update { source, .. } => source.to_string(),
        other => other.to_string(),
    }
}

/// Files changed by an update, `<status> <path>` per line
pub fn changed_files(repo_name: &str, files: &BTreeMap<String, String>) -> String {
    let mut lines = vec![format!("Changed files in {}:", repo_name)];
    if files.is_empty() {
        lines.push("  (none)".to_string());
    }
    lines.extend(
        files
            .iter()
            .map(|(path, status)| format!("  {} {}", status, path)),
    );
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogsmith_core::InstallableInfo;
    use std::path::PathBuf;

    fn cog(name: &str, short: Option<&str>, hidden: bool) -> Installable {
        Installable {
            repo_name: "squid".to_string(),
            name: name.to_string(),
            location: PathBuf::from("/repos/squid").join(name),
            info: InstallableInfo {
                short: short.map(str::to_string),
                hidden,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_cog_list() {
        let available = vec![
            cog("zeta", None, false),
            cog("alpha", Some("First cog"), false),
            cog("secret", None, true),
            cog("mine", Some("Installed one"), false),
        ];
        let installed = vec![cog("mine", Some("Installed one"), false)];

        insta::assert_snapshot!(cog_list("squid", &available, &installed), @r"
        Available Cogs:
        + alpha: First cog
        + zeta

        Installed Cogs:
        - mine: Installed one
        ");
    }

    #[test]
    fn test_empty_cog_list() {
        let available = vec![cog("secret", None, true)];
        assert_eq!(
            cog_list("squid", &available, &[]),
            "There are no cogs in the `squid` repo."
        );
    }

    #[test]
    fn test_cog_info() {
        let mut with_reqs = cog("squid", None, false);
        with_reqs.info.description = Some("Squid things".to_string());
        with_reqs.info.requirements = vec!["tabulate".to_string(), "pyyaml".to_string()];
        assert_eq!(
            cog_info(&with_reqs, &BTreeMap::new()),
            "Information on squid:\nSquid things\n\nRequirements: tabulate, pyyaml"
        );

        let mut versions = BTreeMap::new();
        versions.insert("tabulate".to_string(), Some("0.9.0".to_string()));
        versions.insert("pyyaml".to_string(), None);
        assert_eq!(
            cog_info(&with_reqs, &versions),
            "Information on squid:\nSquid things\n\nRequirements: tabulate (0.9.0), pyyaml (not installed)"
        );

        assert_eq!(
            cog_info(&cog("bare", None, false), &BTreeMap::new()),
            "Information on bare:\n\n\nRequirements: None"
        );
    }

    #[test]
    fn test_repo_info() {
        let dir = tempfile::TempDir::new().unwrap();
        let folder = dir.path().join("squid");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(
            folder.join("info.json"),
            r#"{"description": "Cogs for squids", "short": "Squids"}"#,
        )
        .unwrap();

        let repo = cogsmith_repo::FolderRepo::new("squid", &folder);
        repo.populate().unwrap();

        insta::assert_snapshot!(repo_info(&repo), @r"
        Information on squid:
        Cogs for squids
        ");

        let repos: Vec<Arc<dyn Repo>> = vec![Arc::new(repo)];
        insta::assert_snapshot!(repo_list(&repos).unwrap(), @r"
        Installed Repos:

        + squid: Squids
        ");
        assert!(repo_list(&[]).is_none());
    }

    #[test]
    fn test_update_summary() {
        let report = UpdateReport::default();
        assert_eq!(
            update_summary(&report, None),
            "All installed cogs are already up to date."
        );
        assert_eq!(
            update_summary(&report, Some("squid")),
            "`squid` is already up to date."
        );

        let mut report = UpdateReport::default();
        report
            .updated_cogs
            .insert("squid".to_string(), vec!["a".to_string(), "b".to_string()]);
        report
            .updated_cogs
            .insert("extras".to_string(), vec!["c".to_string()]);
        insta::assert_snapshot!(update_summary(&report, None), @r"
        The following cogs were updated:

        extras:
        + c

        squid:
        + a
        + b

        Run `[p]reload COG_NAME` to reload an updated cog.
        ");
    }

    #[test]
    fn test_install_msg() {
        assert_eq!(with_install_msg("Done.".to_string(), None), "Done.");
        assert_eq!(
            with_install_msg("Done.".to_string(), Some("Thanks!")),
            "Done.\n---\nThanks!"
        );
    }

    #[test]
    fn test_changed_files() {
        let mut files = BTreeMap::new();
        files.insert("squid/squid.py".to_string(), "M".to_string());
        files.insert("new/__init__.py".to_string(), "A".to_string());
        assert_eq!(
            changed_files("squid", &files),
            "Changed files in squid:\n  A new/__init__.py\n  M squid/squid.py"
        );
    }
}
