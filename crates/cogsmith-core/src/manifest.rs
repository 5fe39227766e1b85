//! `info.json` manifest parsing
//!
//! Both repositories and installables may carry an `info.json` file. Manifests
//! are written by hand by cog authors, so parsing is lenient: every field is
//! read independently and a malformed field falls back to its default instead
//! of rejecting the whole file.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::installable::InstallableType;
use crate::version::VersionSpec;

/// Name of the manifest file inside repos and installables
pub const INFO_FILE_NAME: &str = "info.json";

/// Read an `info.json` file into a JSON object
///
/// Returns `Ok(None)` when the file does not exist. Invalid JSON, or JSON that
/// is not an object, is reported as [`CoreError::InvalidManifest`].
pub fn read_info_file(path: &Path) -> Result<Option<serde_json::Map<String, Value>>> {
    if !path.is_file() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content).map_err(|e| CoreError::InvalidManifest {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    match value {
        Value::Object(map) => Ok(Some(map)),
        other => Err(CoreError::InvalidManifest {
            path: path.display().to_string(),
            message: format!("expected a JSON object, found {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Read a list of strings; a bare string counts as a single-element list
pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn optional_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

pub(crate) fn boolean(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        _ => false,
    }
}

/// Repository level metadata from the repo root `info.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepoInfo {
    /// Repository author(s)
    pub author: Vec<String>,

    /// Long description
    pub description: Option<String>,

    /// One-line summary shown in listings
    pub short: Option<String>,

    /// Message shown after the repo is added
    pub install_msg: Option<String>,
}

impl RepoInfo {
    /// Load repo metadata from a repository folder
    ///
    /// A missing or unreadable manifest yields empty metadata.
    pub fn load(folder: &Path) -> Self {
        let path = folder.join(INFO_FILE_NAME);
        match read_info_file(&path) {
            Ok(Some(map)) => Self::from_map(&map),
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!("Ignoring repository info file: {}", e);
                Self::default()
            }
        }
    }

    /// Extract repo metadata from a parsed manifest
    pub fn from_map(map: &serde_json::Map<String, Value>) -> Self {
        Self {
            author: string_list(map.get("author")),
            description: optional_string(map.get("description")),
            short: optional_string(map.get("short")),
            install_msg: optional_string(map.get("install_msg")),
        }
    }
}

/// Where a required cog comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementRepoType {
    #[default]
    Git,
    Pypi,
    #[serde(other)]
    Unknown,
}

/// Reference to the repository containing a required cog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementRepo {
    /// Repository URL, optionally suffixed with `@branch`
    pub url: String,

    /// Repository type
    #[serde(default, rename = "type")]
    pub kind: RequirementRepoType,

    /// Display name used when the repo is missing
    #[serde(default)]
    pub name: Option<String>,
}

/// A cog required by an installable (not a pip requirement)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredCog {
    /// Version specifier; `None` means any version
    #[serde(default)]
    pub version: Option<String>,

    /// Containing repository; `None` means the same repository
    #[serde(default)]
    pub repo: Option<RequirementRepo>,
}

/// Installable metadata parsed from an installable's `info.json`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallableInfo {
    pub author: Vec<String>,
    pub bot_version: VersionSpec,
    pub python_version: VersionSpec,
    pub hidden: bool,
    pub disabled: bool,
    pub required_cogs: BTreeMap<String, RequiredCog>,
    pub requirements: Vec<String>,
    pub tags: BTreeSet<String>,
    pub kind: InstallableType,
    pub description: Option<String>,
    pub short: Option<String>,
    pub install_msg: Option<String>,
}

impl Default for InstallableInfo {
    fn default() -> Self {
        Self {
            author: Vec::new(),
            bot_version: VersionSpec::at_least(3, 0, 0),
            python_version: VersionSpec::at_least(3, 6, 0),
            hidden: false,
            disabled: false,
            required_cogs: BTreeMap::new(),
            requirements: Vec::new(),
            tags: BTreeSet::new(),
            kind: InstallableType::Cog,
            description: None,
            short: None,
            install_msg: None,
        }
    }
}

impl InstallableInfo {
    /// Extract installable metadata from a parsed manifest
    pub fn from_map(map: &serde_json::Map<String, Value>) -> Self {
        let defaults = Self::default();

        let bot_version = map
            .get("bot_version")
            .map(VersionSpec::from_value)
            .transpose()
            .unwrap_or_else(|e| {
                tracing::warn!("Ignoring bot_version: {}", e);
                None
            })
            .unwrap_or(defaults.bot_version);

        let python_version = map
            .get("python_version")
            .map(VersionSpec::from_value)
            .transpose()
            .unwrap_or_else(|e| {
                tracing::warn!("Ignoring python_version: {}", e);
                None
            })
            .unwrap_or(defaults.python_version);

        let kind = match map.get("type") {
            None => InstallableType::Cog,
            Some(Value::String(s)) => InstallableType::from_manifest(s),
            Some(_) => InstallableType::Unknown,
        };

        let required_cogs = match map.get("required_cogs") {
            Some(Value::Object(entries)) => entries
                .iter()
                .filter_map(|(name, value)| {
                    match serde_json::from_value::<RequiredCog>(value.clone()) {
                        Ok(req) => Some((name.clone(), req)),
                        Err(e) => {
                            tracing::warn!("Ignoring required cog '{}': {}", name, e);
                            None
                        }
                    }
                })
                .collect(),
            _ => BTreeMap::new(),
        };

        Self {
            author: string_list(map.get("author")),
            bot_version,
            python_version,
            // Shared libraries are never listed to users
            hidden: boolean(map.get("hidden")) || kind == InstallableType::SharedLibrary,
            disabled: boolean(map.get("disabled")),
            required_cogs,
            requirements: string_list(map.get("requirements")),
            tags: string_list(map.get("tags"))
                .into_iter()
                .map(|t| t.to_lowercase())
                .collect(),
            kind,
            description: optional_string(map.get("description")),
            short: optional_string(map.get("short")),
            install_msg: optional_string(map.get("install_msg")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn as_map(value: Value) -> serde_json::Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_installable_info_full() {
        let info = InstallableInfo::from_map(&as_map(json!({
            "author": ["tekulvw"],
            "bot_version": [3, 0, 0],
            "description": "A long description",
            "hidden": false,
            "install_msg": "A post-installation message",
            "required_cogs": {},
            "requirements": ["tabulate"],
            "short": "A short description",
            "tags": ["Tag1", "tag2"],
            "type": "COG"
        })));

        assert_eq!(info.author, vec!["tekulvw".to_string()]);
        assert_eq!(info.bot_version.as_str(), ">=3.0.0");
        assert_eq!(info.requirements, vec!["tabulate".to_string()]);
        assert!(info.tags.contains("tag1"));
        assert!(info.tags.contains("tag2"));
        assert_eq!(info.kind, InstallableType::Cog);
        assert_eq!(info.short.as_deref(), Some("A short description"));
        assert!(!info.hidden);
    }

    #[test]
    fn test_shared_library_is_hidden() {
        let info = InstallableInfo::from_map(&as_map(json!({"type": "SHARED_LIBRARY"})));
        assert_eq!(info.kind, InstallableType::SharedLibrary);
        assert!(info.hidden);
    }

    #[test]
    fn test_unknown_type() {
        let info = InstallableInfo::from_map(&as_map(json!({"type": "PLUGIN"})));
        assert_eq!(info.kind, InstallableType::Unknown);

        let info = InstallableInfo::from_map(&as_map(json!({"type": 5})));
        assert_eq!(info.kind, InstallableType::Unknown);
    }

    #[test]
    fn test_malformed_fields_fall_back() {
        let info = InstallableInfo::from_map(&as_map(json!({
            "author": "solo",
            "python_version": {"min": 3},
            "requirements": "tabulate",
            "tags": 12
        })));

        assert_eq!(info.author, vec!["solo".to_string()]);
        assert_eq!(info.python_version.as_str(), ">=3.6.0");
        assert_eq!(info.requirements, vec!["tabulate".to_string()]);
        assert!(info.tags.is_empty());
    }

    #[test]
    fn test_required_cogs() {
        let info = InstallableInfo::from_map(&as_map(json!({
            "required_cogs": {
                "economy": {
                    "version": ">=1.0",
                    "repo": {"url": "https://github.com/owner/cogs.git@main", "name": "cogs"}
                },
                "other": {},
                "broken": {"repo": {"type": "git"}}
            }
        })));

        assert_eq!(info.required_cogs.len(), 2);
        let economy = &info.required_cogs["economy"];
        assert_eq!(economy.version.as_deref(), Some(">=1.0"));
        let repo = economy.repo.as_ref().unwrap();
        assert_eq!(repo.kind, RequirementRepoType::Git);
        assert_eq!(repo.name.as_deref(), Some("cogs"));
        assert!(info.required_cogs["other"].repo.is_none());
    }

    #[test]
    fn test_read_info_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(INFO_FILE_NAME);

        assert!(read_info_file(&path).unwrap().is_none());

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            read_info_file(&path),
            Err(CoreError::InvalidManifest { .. })
        ));

        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(read_info_file(&path).is_err());

        std::fs::write(&path, r#"{"short": "hi"}"#).unwrap();
        let map = read_info_file(&path).unwrap().unwrap();
        assert_eq!(map["short"], "hi");
    }

    #[test]
    fn test_repo_info_load() {
        let dir = TempDir::new().unwrap();
        assert_eq!(RepoInfo::load(dir.path()), RepoInfo::default());

        std::fs::write(
            dir.path().join(INFO_FILE_NAME),
            r#"{"author": ["a", "b"], "short": "Cogs", "install_msg": "Thanks!"}"#,
        )
        .unwrap();

        let info = RepoInfo::load(dir.path());
        assert_eq!(info.author, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(info.short.as_deref(), Some("Cogs"));
        assert_eq!(info.install_msg.as_deref(), Some("Thanks!"));
        assert!(info.description.is_none());
    }
}
