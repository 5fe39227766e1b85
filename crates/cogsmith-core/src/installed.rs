//! Registry of cogs installed through the downloader
//!
//! Stored as a JSON list in `<data_dir>/installed.json`. A record is
//! identified by `(repo_name, cog_name)`; the recorded version does not take
//! part in identity, so re-installing a cog replaces its record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// One installed cog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledRecord {
    /// Installed cog name
    pub cog_name: String,

    /// Repository the cog was installed from
    pub repo_name: String,

    /// Installable kind tag (`FOLDER`)
    pub inst_type: String,

    /// Module version at install time (commit hash for git repos)
    #[serde(default)]
    pub cog_version: Option<String>,

    /// Installation timestamp
    #[serde(default)]
    pub installed_at: Option<DateTime<Utc>>,
}

impl InstalledRecord {
    /// Whether this record refers to the given cog
    pub fn is(&self, repo_name: &str, cog_name: &str) -> bool {
        self.repo_name == repo_name && self.cog_name == cog_name
    }
}

/// Persistent list of installed cogs
#[derive(Debug, Clone, Default)]
pub struct InstalledRegistry {
    path: PathBuf,
    records: Vec<InstalledRecord>,
}

impl InstalledRegistry {
    /// Load the registry from `path`; a missing file is an empty registry
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Vec::new()
        };

        Ok(Self { path, records })
    }

    /// Write the registry back to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.records)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Registry file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, in installation order
    pub fn records(&self) -> &[InstalledRecord] {
        &self.records
    }

    /// Find a record by cog name
    pub fn find(&self, cog_name: &str) -> Option<&InstalledRecord> {
        self.records.iter().find(|r| r.cog_name == cog_name)
    }

    /// Add a record, replacing any record for the same cog
    pub fn add(&mut self, record: InstalledRecord) {
        match self
            .records
            .iter_mut()
            .find(|r| r.is(&record.repo_name, &record.cog_name))
        {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    /// Remove the record for a cog; returns whether one was removed
    pub fn remove(&mut self, repo_name: &str, cog_name: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| !r.is(repo_name, cog_name));
        self.records.len() != before
    }

    /// Remove every record belonging to a repository
    pub fn remove_repo(&mut self, repo_name: &str) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.repo_name != repo_name);
        before - self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(repo: &str, cog: &str, version: Option<&str>) -> InstalledRecord {
        InstalledRecord {
            cog_name: cog.to_string(),
            repo_name: repo.to_string(),
            inst_type: "FOLDER".to_string(),
            cog_version: version.map(str::to_string),
            installed_at: None,
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let registry = InstalledRegistry::load(dir.path().join("installed.json")).unwrap();
        assert!(registry.records().is_empty());
    }

    #[test]
    fn test_add_replaces_same_cog() {
        let mut registry = InstalledRegistry::default();
        registry.add(record("repo", "cog", Some("v1")));
        registry.add(record("repo", "cog", Some("v2")));
        registry.add(record("other", "cog", None));

        assert_eq!(registry.records().len(), 2);
        assert_eq!(registry.records()[0].cog_version.as_deref(), Some("v2"));
    }

    #[test]
    fn test_remove_ignores_version() {
        let mut registry = InstalledRegistry::default();
        registry.add(record("repo", "cog", Some("abc")));

        assert!(registry.remove("repo", "cog"));
        assert!(!registry.remove("repo", "cog"));
        assert!(registry.records().is_empty());
    }

    #[test]
    fn test_remove_repo() {
        let mut registry = InstalledRegistry::default();
        registry.add(record("a", "one", None));
        registry.add(record("a", "two", None));
        registry.add(record("b", "three", None));

        assert_eq!(registry.remove_repo("a"), 2);
        assert_eq!(registry.records().len(), 1);
        assert!(registry.find("three").is_some());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("installed.json");

        let mut registry = InstalledRegistry::load(&path).unwrap();
        registry.add(record("repo", "cog", Some("abc")));
        registry.save().unwrap();

        let reloaded = InstalledRegistry::load(&path).unwrap();
        assert_eq!(reloaded.records(), registry.records());
        assert_eq!(reloaded.path(), path.as_path());
    }
}
