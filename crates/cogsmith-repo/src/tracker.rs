//! Update tracking
//!
//! An [`UpdateTracker`] snapshots a repository's modules and versions before
//! an update and diffs them against the state afterwards.

use cogsmith_core::{Installable, InstallableType};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::repo::Repo;

/// Modules split by kind, each list sorted by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleLists {
    pub cogs: Vec<Installable>,
    pub shared_libraries: Vec<Installable>,
    pub others: Vec<Installable>,
}

impl ModuleLists {
    pub fn from_modules(modules: impl IntoIterator<Item = Installable>) -> Self {
        let mut lists = Self::default();
        for module in modules {
            match module.kind() {
                InstallableType::Cog => lists.cogs.push(module),
                InstallableType::SharedLibrary => lists.shared_libraries.push(module),
                InstallableType::Unknown => lists.others.push(module),
            }
        }
        for list in [&mut lists.cogs, &mut lists.shared_libraries, &mut lists.others] {
            list.sort_by(|a, b| a.name.cmp(&b.name));
        }
        lists
    }

    pub fn is_empty(&self) -> bool {
        self.cogs.is_empty() && self.shared_libraries.is_empty() && self.others.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cogs.len() + self.shared_libraries.len() + self.others.len()
    }

    /// All modules, cogs first
    pub fn iter(&self) -> impl Iterator<Item = &Installable> {
        self.cogs
            .iter()
            .chain(&self.shared_libraries)
            .chain(&self.others)
    }
}

/// What an update changed in one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    pub repo_name: String,

    /// Repository version before the update, when the repository has one
    pub old_version: Option<String>,

    /// Repository version after the update
    pub new_version: Option<String>,

    /// Modules that did not exist before
    pub new: ModuleLists,

    /// Modules whose version changed; every surviving module when the
    /// repository has no per-module versions
    pub updated: ModuleLists,

    /// Modules that no longer exist (as they were before the update)
    pub removed: ModuleLists,
}

impl UpdateResult {
    /// Whether the repository version moved
    pub fn version_changed(&self) -> bool {
        self.old_version != self.new_version
    }
}

/// Captures repository state for comparison after an update
pub struct UpdateTracker<'a, R: Repo + ?Sized> {
    repo: &'a R,
    snapshot_version: Option<String>,
    snapshot_modules: BTreeMap<String, Installable>,
    snapshot_module_versions: BTreeMap<String, Option<String>>,
}

impl<'a, R: Repo + ?Sized> UpdateTracker<'a, R> {
    /// Snapshot the repository's current modules
    pub fn new(repo: &'a R) -> Self {
        let snapshot_modules = repo
            .available_modules()
            .into_iter()
            .map(|m| (m.name.clone(), m))
            .collect();

        Self {
            repo,
            snapshot_version: None,
            snapshot_modules,
            snapshot_module_versions: BTreeMap::new(),
        }
    }

    /// Record the repository and module versions
    pub async fn populate(&mut self) -> Result<()> {
        self.snapshot_version = repo_version(self.repo).await?;
        self.snapshot_module_versions = module_versions(self.repo).await?;
        Ok(())
    }

    /// Compare the current repository state against the snapshot
    ///
    /// Returns `None` when nothing changed.
    pub async fn compare(&self) -> Result<Option<UpdateResult>> {
        let compare_version = repo_version(self.repo).await?;
        let compare_modules: BTreeMap<String, Installable> = self
            .repo
            .available_modules()
            .into_iter()
            .map(|m| (m.name.clone(), m))
            .collect();
        let compare_module_versions = module_versions(self.repo).await?;

        let before: BTreeSet<&String> = self.snapshot_modules.keys().collect();
        let after: BTreeSet<&String> = compare_modules.keys().collect();

        let new: Vec<&String> = after.difference(&before).copied().collect();
        let removed: Vec<&String> = before.difference(&after).copied().collect();
        let updated: Vec<&String> = after
            .intersection(&before)
            .copied()
            .filter(|name| {
                compare_module_versions.is_empty()
                    || compare_module_versions.get(*name)
                        != self.snapshot_module_versions.get(*name)
            })
            .collect();

        if compare_version == self.snapshot_version
            && new.is_empty()
            && updated.is_empty()
            && removed.is_empty()
        {
            return Ok(None);
        }

        let pick = |names: &[&String], from: &BTreeMap<String, Installable>| {
            ModuleLists::from_modules(names.iter().filter_map(|n| from.get(*n).cloned()))
        };

        Ok(Some(UpdateResult {
            repo_name: self.repo.name().to_string(),
            old_version: self.snapshot_version.clone(),
            new_version: compare_version,
            new: pick(&new, &compare_modules),
            updated: pick(&updated, &compare_modules),
            removed: pick(&removed, &self.snapshot_modules),
        }))
    }
}

async fn repo_version<R: Repo + ?Sized>(repo: &R) -> Result<Option<String>> {
    match repo.repo_version().await {
        Err(e) if e.is_unsupported() => Ok(None),
        other => other,
    }
}

/// Module versions by name; empty when the repository has none
async fn module_versions<R: Repo + ?Sized>(repo: &R) -> Result<BTreeMap<String, Option<String>>> {
    let mut versions = BTreeMap::new();
    for module in repo.available_modules() {
        match repo.module_version(&module).await {
            Ok(version) => {
                versions.insert(module.name.clone(), version);
            }
            Err(e) if e.is_unsupported() => return Ok(BTreeMap::new()),
            Err(e) => return Err(e),
        }
    }
    Ok(versions)
}
