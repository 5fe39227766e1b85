//! Version specifiers used by info.json manifests
//!
//! Manifests express `bot_version` and `python_version` either as a minimum
//! version array (`[3, 6, 0]`) or as a PEP 440 style specifier string
//! (`">=3.6"`, `"~=3.8"`). Both are normalized into a [`semver::VersionReq`].

use semver::{Version, VersionReq};
use serde_json::Value;
use std::fmt;

use crate::error::{CoreError, Result};

/// A version requirement parsed from a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSpec {
    raw: String,
    req: VersionReq,
}

impl VersionSpec {
    /// Requirement satisfied by `major.minor.patch` and anything newer
    pub fn at_least(major: u64, minor: u64, patch: u64) -> Self {
        let raw = format!(">={}.{}.{}", major, minor, patch);
        let req = VersionReq::parse(&raw).unwrap_or(VersionReq::STAR);
        Self { raw, req }
    }

    /// Build a minimum-version requirement from `[major, minor, patch]` components
    ///
    /// Missing components default to zero, extra components are ignored.
    pub fn from_components(parts: &[u64]) -> Self {
        let get = |i: usize| parts.get(i).copied().unwrap_or(0);
        Self::at_least(get(0), get(1), get(2))
    }

    /// Parse a specifier string
    ///
    /// Accepts semver requirements and the common PEP 440 operators
    /// (`==`, `~=`, `>=`, `<`, ...). Clauses are comma separated.
    pub fn parse(spec: &str) -> Result<Self> {
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidVersionSpec {
                spec: spec.to_string(),
                message: "empty specifier".to_string(),
            });
        }

        let clauses = trimmed
            .split(',')
            .map(|clause| translate_clause(clause.trim()))
            .collect::<Result<Vec<_>>>()?;

        let req = VersionReq::parse(&clauses.join(", ")).map_err(|e| {
            CoreError::InvalidVersionSpec {
                spec: spec.to_string(),
                message: e.to_string(),
            }
        })?;

        Ok(Self {
            raw: trimmed.to_string(),
            req,
        })
    }

    /// Parse a manifest value (array of integers or specifier string)
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Array(items) => {
                let parts = items
                    .iter()
                    .map(|item| {
                        item.as_u64().ok_or_else(|| CoreError::InvalidVersionSpec {
                            spec: value.to_string(),
                            message: "version components must be non-negative integers".to_string(),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::from_components(&parts))
            }
            other => Err(CoreError::InvalidVersionSpec {
                spec: other.to_string(),
                message: "expected a string or an array of integers".to_string(),
            }),
        }
    }

    /// Check whether a concrete version satisfies this requirement
    pub fn matches(&self, version: &Version) -> bool {
        self.req.matches(version)
    }

    /// The specifier as written in the manifest (or generated)
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Lowest version allowed by a lower-bound clause, if there is one
    pub fn minimum(&self) -> Option<Version> {
        use semver::Op;

        self.req
            .comparators
            .iter()
            .filter(|c| matches!(c.op, Op::GreaterEq | Op::Exact | Op::Tilde | Op::Caret))
            .map(|c| Version::new(c.major, c.minor.unwrap_or(0), c.patch.unwrap_or(0)))
            .max()
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn translate_clause(clause: &str) -> Result<String> {
    if let Some(rest) = clause.strip_prefix("~=") {
        // Compatible release: ~=3.8 allows 3.x >= 3.8, ~=3.8.1 allows 3.8.x >= 3.8.1
        let rest = rest.trim();
        let components = rest.split('.').count();
        return Ok(if components <= 2 {
            format!("^{}", rest)
        } else {
            format!("~{}", rest)
        });
    }
    if let Some(rest) = clause.strip_prefix("===") {
        return Ok(format!("={}", rest.trim()));
    }
    if let Some(rest) = clause.strip_prefix("==") {
        return Ok(format!("={}", rest.trim()));
    }
    if clause.starts_with("!=") {
        return Err(CoreError::InvalidVersionSpec {
            spec: clause.to_string(),
            message: "exclusion specifiers are not supported".to_string(),
        });
    }
    Ok(clause.to_string())
}

/// Parse a version string loosely (`"3.11"`, `"3.12.0rc1"`, `"Python 3.9.7"`)
///
/// Only the leading numeric `major.minor.patch` components are considered.
pub fn parse_loose_version(input: &str) -> Option<Version> {
    let candidate = input
        .split_whitespace()
        .find(|word| word.starts_with(|c: char| c.is_ascii_digit()))?;

    let mut parts = [0u64; 3];
    let mut found = 0;
    for (slot, piece) in parts.iter_mut().zip(candidate.split('.')) {
        let digits: String = piece.chars().take_while(char::is_ascii_digit).collect();
        if digits.is_empty() {
            break;
        }
        *slot = digits.parse().ok()?;
        found += 1;
        if digits.len() != piece.len() {
            break;
        }
    }

    (found > 0).then(|| Version::new(parts[0], parts[1], parts[2]))
}
