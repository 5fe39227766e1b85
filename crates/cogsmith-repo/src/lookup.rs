//! Command ownership lookup
//!
//! `findcog` needs to know which cog defines a command. The downloader does
//! not load cogs itself, so the host bot publishes a command index and the
//! downloader reads it through a [`CommandLookup`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;

/// Where a command is defined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOwner {
    /// Dotted module path of the cog class (`mycog.mycog`)
    pub module: String,

    /// Cog class name
    #[serde(default)]
    pub cog: Option<String>,
}

impl CommandOwner {
    pub fn new(module: impl Into<String>, cog: Option<&str>) -> Self {
        Self {
            module: module.into(),
            cog: cog.map(str::to_string),
        }
    }

    /// Name the downloader would have installed the cog under
    ///
    /// Cogs live in `<package>/<module>.py`, so this is the second to last
    /// dotted segment (or the only one).
    pub fn package_name(&self) -> &str {
        let segments: Vec<&str> = self.module.split('.').collect();
        match segments.len() {
            0 | 1 => &self.module,
            n => segments[n - 2],
        }
    }

    /// Cog class name, falling back to the last module segment
    pub fn cog_name(&self) -> &str {
        self.cog
            .as_deref()
            .unwrap_or_else(|| self.module.rsplit('.').next().unwrap_or(&self.module))
    }
}

/// Resolves a command name to its defining cog
pub trait CommandLookup: Send + Sync {
    fn command_owner(&self, command: &str) -> Option<CommandOwner>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IndexEntry {
    Module(String),
    Owner(CommandOwner),
}

/// Lookup backed by a JSON index of `{command: module}` or
/// `{command: {"module": ..., "cog": ...}}`
#[derive(Debug, Clone, Default)]
pub struct IndexFileLookup {
    commands: BTreeMap<String, CommandOwner>,
}

impl IndexFileLookup {
    /// Load an index file; a missing file is an empty index
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No command index at {}", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let raw: BTreeMap<String, IndexEntry> = serde_json::from_str(&content)?;
        let commands = raw
            .into_iter()
            .map(|(name, entry)| {
                let owner = match entry {
                    IndexEntry::Module(module) => CommandOwner::new(module, None),
                    IndexEntry::Owner(owner) => owner,
                };
                (name, owner)
            })
            .collect();

        Ok(Self { commands })
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, CommandOwner)>) -> Self {
        Self {
            commands: entries.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl CommandLookup for IndexFileLookup {
    fn command_owner(&self, command: &str) -> Option<CommandOwner> {
        self.commands.get(command).cloned()
    }
}
