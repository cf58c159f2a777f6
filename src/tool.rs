//! Description of the tool being provisioned.

use crate::VersionRequest;
use serde::{Deserialize, Serialize};

/// Everything that identifies the tool to install and how to reach it.
///
/// The default describes the GitHub Copilot CLI, which reads its token from
/// `COPILOT_GITHUB_TOKEN`; every field can be overridden from the command
/// line.
///
/// # Example
///
/// ```rust
/// use cli_provisioner::{ToolSpec, VersionRequest};
///
/// let tool = ToolSpec::default();
/// assert_eq!(tool.package_reference(&VersionRequest::Latest), tool.package);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Registry package name for the package-manager strategy.
    pub package: String,

    /// Executable name looked up on the search path.
    pub binary: String,

    /// URL of the shell install script used by the fallback strategy.
    pub install_script_url: String,

    /// Environment variable the tool reads its credential from.
    pub credential_env: String,

    /// Flag that makes the binary print its version and exit.
    pub version_flag: String,

    /// Arguments that start an interactive session.
    pub interactive_args: Vec<String>,
}

impl Default for ToolSpec {
    fn default() -> Self {
        Self {
            package: "@github/copilot".to_string(),
            binary: "copilot".to_string(),
            install_script_url: "https://gh.io/copilot-install".to_string(),
            credential_env: "COPILOT_GITHUB_TOKEN".to_string(),
            version_flag: "--version".to_string(),
            interactive_args: vec![],
        }
    }
}

impl ToolSpec {
    /// Registry reference for a version request.
    ///
    /// `latest` installs the bare package name, `prerelease` the
    /// `prerelease` dist-tag and an exact version pins it without its
    /// leading "v".
    pub fn package_reference(&self, request: &VersionRequest) -> String {
        match request {
            VersionRequest::Latest => self.package.clone(),
            VersionRequest::Prerelease => format!("{}@prerelease", self.package),
            VersionRequest::Exact(_) => {
                format!("{}@{}", self.package, request.exact().unwrap_or_default())
            }
        }
    }
}
