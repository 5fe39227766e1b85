//! Parsing of `pip show` output

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(?P<key>Name|Version):[ \t]*(?P<value>.*?)[ \t]*$")
        .expect("pip header pattern is valid")
});

/// Map lowercase package name to installed version
///
/// `pip show` prints one block of `Key: value` headers per package,
/// separated by `---` lines. Blocks without a name or version are skipped.
pub fn parse_pip_show(stdout: &str) -> BTreeMap<String, String> {
    let normalized = stdout.replace("\r\n", "\n");
    let mut versions = BTreeMap::new();

    for block in normalized.split("\n---\n") {
        // Only the header section, before the first blank line
        let headers = block.split("\n\n").next().unwrap_or_default();

        let mut name = None;
        let mut version = None;
        for caps in HEADER_RE.captures_iter(headers) {
            match &caps["key"] {
                "Name" => name = Some(caps["value"].to_string()),
                "Version" => version = Some(caps["value"].to_string()),
                _ => {}
            }
        }

        if let (Some(name), Some(version)) = (name, version) {
            versions.insert(name.to_lowercase(), version);
        }
    }

    versions
}

/// Distribution name of a requirement string
///
/// `aiorwlock==0.5.0` and `yarl[idna] >= 1.4` give `aiorwlock` and `yarl`.
pub fn requirement_name(requirement: &str) -> &str {
    let requirement = requirement.trim();
    let end = requirement
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        .unwrap_or(requirement.len());
    &requirement[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = "Name: PyYAML
Version: 6.0.1
Summary: YAML parser and emitter for Python
Home-page: https://pyyaml.org/
Requires:
Required-by: cogsmith-test
---
Name: aiohttp
Version: 3.9.1
Summary: Async http client/server framework (asyncio)
Location: /venv/lib/python3.11/site-packages
";

    #[test]
    fn test_parse_blocks() {
        let versions = parse_pip_show(OUTPUT);
        assert_eq!(versions.len(), 2);
        assert_eq!(versions["pyyaml"], "6.0.1");
        assert_eq!(versions["aiohttp"], "3.9.1");
    }

    #[test]
    fn test_parse_empty_and_windows_newlines() {
        assert!(parse_pip_show("").is_empty());

        let versions = parse_pip_show("Name: Foo\r\nVersion: 1.0\r\n---\r\nName: bar\r\nVersion: 2\r\n");
        assert_eq!(versions["foo"], "1.0");
        assert_eq!(versions["bar"], "2");
    }

    #[test]
    fn test_ignores_description_lines() {
        let versions = parse_pip_show("Name: thing\nVersion: 0.1\n\nName: bogus\nVersion: 9\n");
        assert_eq!(versions.len(), 1);
        assert_eq!(versions["thing"], "0.1");
    }

    #[test]
    fn test_requirement_name() {
        assert_eq!(requirement_name("tabulate"), "tabulate");
        assert_eq!(requirement_name("aiorwlock==0.5.0"), "aiorwlock");
        assert_eq!(requirement_name(" yarl[idna] >= 1.4"), "yarl");
        assert_eq!(requirement_name("python-dateutil; python_version < '3.9'"), "python-dateutil");
    }
}
