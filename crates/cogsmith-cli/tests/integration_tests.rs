//! Integration tests for CLI commands

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Helper to run cogsmith against an isolated data directory
fn cogsmith(data_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cogsmith"))
        .args(args)
        .env("COGSMITH_DATA_DIR", data_dir)
        .env("COGSMITH_CONFIG", data_dir.join("config.yaml"))
        .env_remove("COGSMITH_LOG")
        .output()
        .expect("Failed to execute cogsmith")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Data directory with an empty config file
fn data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.yaml"), "forceVenv: true\n").unwrap();
    dir
}

/// Create a cog package inside a repository folder
fn write_cog(repo: &Path, name: &str, info: &str) {
    let cog = repo.join(name);
    std::fs::create_dir_all(&cog).unwrap();
    std::fs::write(cog.join("__init__.py"), "").unwrap();
    std::fs::write(cog.join(format!("{}.py", name)), "").unwrap();
    std::fs::write(cog.join("info.json"), info).unwrap();
}

/// Folder repo "local" with two cogs and a hidden one
fn local_repo(dir: &Path) {
    let output = cogsmith(dir, &["repo", "add-folder", "local"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let repo = dir.join("repos").join("local");
    write_cog(
        &repo,
        "mycog",
        r#"{"author": ["someone"], "short": "Does things", "description": "Does many things"}"#,
    );
    write_cog(&repo, "other", "{}");
    write_cog(&repo, "secret", r#"{"hidden": true}"#);
}

mod repo_command {
    use super::*;

    #[test]
    fn test_empty_repo_list() {
        let dir = data_dir();
        let output = cogsmith(dir.path(), &["repo", "list"]);

        assert!(output.status.success());
        assert!(stdout(&output).contains("No repos found."));
    }

    #[test]
    fn test_add_folder_and_list() {
        let dir = data_dir();
        let output = cogsmith(dir.path(), &["repo", "add-folder", "Local"]);

        assert!(output.status.success());
        assert!(stdout(&output).contains("Repo `local` successfully added."));
        assert!(dir.path().join("repos").join("local").is_dir());

        let output = cogsmith(dir.path(), &["repo", "list"]);
        let out = stdout(&output);
        assert!(out.contains("Installed Repos:"));
        assert!(out.contains("+ local"));

        let output = cogsmith(dir.path(), &["repo", "info", "local"]);
        assert!(stdout(&output).contains("Information on local:"));
    }

    #[test]
    fn test_invalid_repo_name() {
        let dir = data_dir();
        let output = cogsmith(dir.path(), &["repo", "add-folder", "bad-name"]);

        assert_eq!(output.status.code(), Some(64));
        assert!(stderr(&output).contains("`bad-name` is not a valid repository name."));
    }

    #[test]
    fn test_duplicate_repo() {
        let dir = data_dir();
        cogsmith(dir.path(), &["repo", "add-folder", "local"]);
        let output = cogsmith(dir.path(), &["repo", "add-folder", "LOCAL"]);

        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("That repo has already been added under another name."));
    }

    #[test]
    fn test_delete_repo() {
        let dir = data_dir();
        cogsmith(dir.path(), &["repo", "add-folder", "local"]);

        let output = cogsmith(dir.path(), &["repo", "delete", "local"]);
        assert!(output.status.success());
        assert!(stdout(&output).contains("The `local` repo has been successfully deleted."));
        assert!(!dir.path().join("repos").join("local").exists());

        let output = cogsmith(dir.path(), &["repo", "delete", "local"]);
        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("Repo by the name local does not exist."));
    }

    #[test]
    fn test_add_requires_agreement() {
        let dir = data_dir();
        let mut child = Command::new(env!("CARGO_BIN_EXE_cogsmith"))
            .args(["repo", "add", "squid", "https://github.com/tekulvw/Squid-Plugins"])
            .env("COGSMITH_DATA_DIR", dir.path())
            .env("COGSMITH_CONFIG", dir.path().join("config.yaml"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to execute cogsmith");

        child.stdin.take().unwrap().write_all(b"no\n").unwrap();
        let output = child.wait_with_output().unwrap();

        assert!(output.status.success());
        let out = stdout(&output);
        assert!(out.contains("By typing 'I agree'"));
        assert!(out.contains("Not adding repo."));
        assert!(!dir.path().join("repos").join("squid").exists());
    }
}

mod cog_command {
    use super::*;

    #[test]
    fn test_cog_list() {
        let dir = data_dir();
        local_repo(dir.path());

        let output = cogsmith(dir.path(), &["cog", "list", "local"]);
        assert!(output.status.success());
        let out = stdout(&output);
        assert!(out.contains("Available Cogs:\n+ mycog: Does things\n+ other"));
        assert!(!out.contains("secret"));
    }

    #[test]
    fn test_cog_info() {
        let dir = data_dir();
        local_repo(dir.path());

        let output = cogsmith(dir.path(), &["cog", "info", "local", "mycog"]);
        assert!(stdout(&output).contains("Information on mycog:\nDoes many things\n\nRequirements: None"));

        let output = cogsmith(dir.path(), &["cog", "info", "local", "ghost"]);
        assert_eq!(output.status.code(), Some(64));
        assert!(stderr(&output).contains("There is no cog `ghost` in the repo `local`"));
    }

    #[test]
    fn test_install_update_uninstall() {
        let dir = data_dir();
        local_repo(dir.path());

        let output = cogsmith(dir.path(), &["cog", "install", "local", "mycog"]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert!(stdout(&output).contains("Cog `mycog` successfully installed."));
        assert!(dir.path().join("cogs").join("mycog").join("mycog.py").is_file());

        let registry: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("installed.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(registry[0]["cog_name"], "mycog");
        assert_eq!(registry[0]["repo_name"], "local");

        let output = cogsmith(dir.path(), &["cog", "list", "local"]);
        assert!(stdout(&output).contains("Installed Cogs:\n- mycog: Does things"));

        let output = cogsmith(dir.path(), &["cog", "update"]);
        assert!(output.status.success());
        assert!(stdout(&output).contains("All installed cogs are already up to date."));

        let output = cogsmith(dir.path(), &["cog", "update", "mycog"]);
        assert!(stdout(&output).contains("`mycog` is already up to date."));

        let output = cogsmith(dir.path(), &["cog", "uninstall", "mycog"]);
        assert!(output.status.success());
        assert!(stdout(&output).contains("`mycog` was successfully removed."));
        assert!(!dir.path().join("cogs").join("mycog").exists());
    }

    #[test]
    fn test_install_unknown_cog() {
        let dir = data_dir();
        local_repo(dir.path());

        let output = cogsmith(dir.path(), &["cog", "install", "local", "secret_missing"]);
        assert_eq!(output.status.code(), Some(64));
        assert!(stderr(&output).contains("There is no cog by the name of `secret_missing` in the `local` repo."));
    }

    #[test]
    fn test_uninstall_not_installed() {
        let dir = data_dir();
        let output = cogsmith(dir.path(), &["cog", "uninstall", "mycog"]);

        assert_eq!(output.status.code(), Some(64));
        assert!(stderr(&output).contains("`mycog` is not installed."));
    }
}

mod findcog_command {
    use super::*;

    #[test]
    fn test_findcog() {
        let dir = data_dir();
        local_repo(dir.path());

        let index = dir.path().join("commands.json");
        std::fs::write(
            &index,
            r#"{"dothing": "mycog.mycog", "ping": {"module": "redbot.core.core_commands", "cog": "Core"}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("config.yaml"),
            format!("forceVenv: true\ncommandIndex: {}\n", index.display()),
        )
        .unwrap();

        cogsmith(dir.path(), &["cog", "install", "local", "mycog"]);

        let output = cogsmith(dir.path(), &["findcog", "dothing"]);
        let out = stdout(&output);
        assert!(out.contains("Command: dothing\nMade by: someone\n"));
        assert!(out.contains("Cog name: mycog"));

        let output = cogsmith(dir.path(), &["findcog", "ping"]);
        assert!(stdout(&output).contains("Made by: 26 & co."));

        let output = cogsmith(dir.path(), &["findcog", "nothing"]);
        assert_eq!(output.status.code(), Some(64));
        assert!(stderr(&output).contains("That command doesn't seem to exist."));
    }
}

mod config {
    use super::*;

    #[test]
    fn test_missing_config_file() {
        let dir = TempDir::new().unwrap();
        let output = cogsmith(dir.path(), &["repo", "list"]);

        assert_eq!(output.status.code(), Some(78));
        assert!(stderr(&output).contains("does not exist"));
    }

    #[test]
    fn test_invalid_config_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.yaml"), "threads: 0\n").unwrap();
        let output = cogsmith(dir.path(), &["repo", "list"]);

        assert_eq!(output.status.code(), Some(78));
    }
}
