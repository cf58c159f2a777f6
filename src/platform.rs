//! Host platform resolution.

use crate::ProvisionError;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// Supported operating systems.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Macos,
    Windows,
}

/// Supported CPU architectures.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X64,
    Arm64,
}

impl Platform {
    fn from_host(os: &str) -> Option<Self> {
        match os {
            "linux" => Some(Self::Linux),
            "macos" | "darwin" => Some(Self::Macos),
            "windows" | "win32" => Some(Self::Windows),
            _ => None,
        }
    }

    /// Whether the downloaded install script can run here.
    pub fn supports_install_script(&self) -> bool {
        matches!(self, Self::Linux | Self::Macos)
    }

    /// Platform fragment used in Node.js release archive names.
    pub fn node_dist_name(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "darwin",
            Self::Windows => "win",
        }
    }
}

impl Arch {
    fn from_host(arch: &str) -> Option<Self> {
        match arch {
            "x86_64" | "x64" | "amd64" => Some(Self::X64),
            "aarch64" | "arm64" => Some(Self::Arm64),
            _ => None,
        }
    }
}

/// A validated (platform, arch) pair.
///
/// The only way to obtain one is [`TargetSpec::resolve`] (or
/// [`TargetSpec::from_host`]), so every holder can assume the pair is in the
/// supported 3x2 matrix.
///
/// # Example
///
/// ```rust
/// use cli_provisioner::{Arch, Platform, TargetSpec};
///
/// let target = TargetSpec::resolve("linux", "x86_64").unwrap();
/// assert_eq!(target.platform(), Platform::Linux);
/// assert_eq!(target.arch(), Arch::X64);
///
/// assert!(TargetSpec::resolve("freebsd", "x86_64").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TargetSpec {
    platform: Platform,
    arch: Arch,
}

impl TargetSpec {
    /// Map an OS and architecture identifier to a target.
    ///
    /// Accepts Rust's `std::env::consts` names as well as Node.js style
    /// names (`darwin`, `win32`, `x64`, `arm64`).
    pub fn resolve(os: &str, arch: &str) -> Result<Self, ProvisionError> {
        let platform = Platform::from_host(os).ok_or_else(|| ProvisionError::UnsupportedPlatform {
            os: os.to_string(),
            fix: format!(
                "Run on one of: {}",
                Platform::iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        })?;
        let arch = Arch::from_host(arch).ok_or_else(|| ProvisionError::UnsupportedArchitecture {
            arch: arch.to_string(),
            fix: "Use an x64 or arm64 runner".to_string(),
        })?;
        tracing::debug!(%platform, %arch, "resolved target");
        Ok(Self { platform, arch })
    }

    /// Resolve the target of the machine this process runs on.
    pub fn from_host() -> Result<Self, ProvisionError> {
        Self::resolve(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    /// Suffix of the Node.js release archive for this target, e.g.
    /// `-linux-x64.tar.gz` or `-win-arm64.zip`.
    pub fn node_archive_suffix(&self) -> String {
        let ext = match self.platform {
            Platform::Windows => "zip",
            Platform::Linux | Platform::Macos => "tar.gz",
        };
        format!("-{}-{}.{}", self.platform.node_dist_name(), self.arch, ext)
    }
}

impl std::fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.platform, self.arch)
    }
}
