//! Version output parsing with regex extraction.

use crate::version_request::normalize;
use regex::Regex;
use semver::Version;
use std::sync::OnceLock;

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+)\.(\d+)\.(\d+)(?:-[0-9A-Za-z][0-9A-Za-z.-]*)?")
            .expect("Invalid version regex")
    })
}

/// Parse a semantic version from CLI output.
///
/// Extracts the first `major.minor.patch` (with an optional pre-release
/// suffix) from arbitrary output:
///
/// - `0.0.1751234567-g1a2b3c` -> 0.0.1751234567-g1a2b3c
/// - `copilot 1.4.0 (stable)` -> 1.4.0
/// - `v2.0.0-beta.3` -> 2.0.0-beta.3
///
/// A suffix semver rejects (such as a trailing dot) is dropped rather than
/// failing the whole parse.
pub(crate) fn parse_version(output: &str) -> Option<Version> {
    let caps = version_re().captures(output)?;
    if let Ok(version) = Version::parse(&caps[0]) {
        return Some(version);
    }
    let part = |i: usize| caps[i].parse::<u64>().ok();
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

/// The version to report for `--version` output: the extracted semantic
/// version when there is one, the trimmed output otherwise.
pub(crate) fn resolved_version(output: &str) -> String {
    parse_version(output)
        .map(|v| v.to_string())
        .unwrap_or_else(|| output.trim().to_string())
}

/// Whether `reported` output satisfies an exact `requested` version. Leading
/// "v"s are ignored on both sides.
pub(crate) fn matches_requested(reported: &str, requested: &str) -> bool {
    normalize(reported.trim()).contains(normalize(requested.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_version() {
        assert_eq!(parse_version("1.1.25"), Some(Version::new(1, 1, 25)));
    }

    #[test]
    fn test_parse_version_with_name() {
        assert_eq!(
            parse_version("copilot 1.4.0 (stable)\n"),
            Some(Version::new(1, 4, 0))
        );
    }

    #[test]
    fn test_parse_prerelease() {
        let version = parse_version("v2.0.0-beta.3").unwrap();
        assert_eq!(version.to_string(), "2.0.0-beta.3");
    }

    #[test]
    fn test_parse_bad_suffix_keeps_core() {
        assert_eq!(parse_version("3.2.1-rc."), Some(Version::new(3, 2, 1)));
    }

    #[test]
    fn test_parse_multiline() {
        let output = "My Tool\nVersion: 1.0.0\nBuilt on 2025-01-01";
        assert_eq!(parse_version(output), Some(Version::new(1, 0, 0)));
    }

    #[test]
    fn test_parse_no_match() {
        assert_eq!(parse_version("no version here"), None);
        assert_eq!(parse_version("version 1.2"), None);
    }

    #[test]
    fn test_resolved_version_falls_back_to_output() {
        assert_eq!(resolved_version("copilot 2.0.0\n"), "2.0.0");
        assert_eq!(resolved_version("  nightly build\n"), "nightly build");
    }

    #[test]
    fn test_matches_requested() {
        assert!(matches_requested("1.2.3\n", "v1.2.3"));
        assert!(matches_requested("v1.2.3", "1.2.3"));
        assert!(matches_requested("copilot 1.2.3 (stable)", "v1.2.3"));
        assert!(!matches_requested("1.2.4", "v1.2.3"));
    }
}
