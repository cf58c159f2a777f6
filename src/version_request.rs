//! Parsing of the caller's version input.

use crate::ProvisionError;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// `v?N.N.N` with an optional pre-release suffix.
const EXACT_VERSION_PATTERN: &str = r"^v?\d+\.\d+\.\d+(-[0-9A-Za-z][0-9A-Za-z.-]*)?$";

fn exact_version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(EXACT_VERSION_PATTERN).expect("Invalid version regex"))
}

/// Which release of the tool to install.
///
/// # Example
///
/// ```rust
/// use cli_provisioner::VersionRequest;
///
/// assert_eq!(VersionRequest::parse("latest").unwrap(), VersionRequest::Latest);
/// assert_eq!(
///     VersionRequest::parse("v1.2.3").unwrap(),
///     VersionRequest::Exact("v1.2.3".to_string())
/// );
/// assert!(VersionRequest::parse("1.2").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "version", rename_all = "lowercase")]
pub enum VersionRequest {
    Latest,
    Prerelease,
    /// An exact version exactly as the caller wrote it.
    Exact(String),
}

impl VersionRequest {
    /// Validate and classify a version input.
    pub fn parse(input: &str) -> Result<Self, ProvisionError> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }
        if trimmed.eq_ignore_ascii_case("prerelease") {
            return Ok(Self::Prerelease);
        }
        if exact_version_re().is_match(trimmed) {
            return Ok(Self::Exact(trimmed.to_string()));
        }
        Err(ProvisionError::InvalidVersion {
            input: input.to_string(),
            fix: "Pass 'latest', 'prerelease' or an exact version such as v1.2.3".to_string(),
        })
    }

    /// The exact version with any leading "v" stripped, if one was requested.
    pub fn exact(&self) -> Option<&str> {
        match self {
            Self::Exact(v) => Some(normalize(v)),
            Self::Latest | Self::Prerelease => None,
        }
    }
}

impl std::fmt::Display for VersionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Prerelease => f.write_str("prerelease"),
            Self::Exact(v) => f.write_str(v),
        }
    }
}

/// Strip surrounding whitespace and a single leading "v".
pub(crate) fn normalize(version: &str) -> &str {
    let trimmed = version.trim();
    trimmed.strip_prefix('v').unwrap_or(trimmed)
}
