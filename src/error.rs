//! Error types for provisioning runs.
//!
//! Every terminal failure of a run is a [`ProvisionError`]. Each variant
//! carries the text captured at the point of failure and a `fix` field with an
//! actionable suggestion, so a failed CI step can be triaged from its log
//! alone.

use crate::install::InstallOutcome;
use crate::session::ExitCause;
use serde::Serialize;
use thiserror::Error;

/// The stage of a run an error was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Stage {
    /// Parsing the caller's inputs.
    Configuration,
    /// Mapping the host to a supported target.
    Platform,
    /// Ensuring the runtime and package manager are recent enough.
    Prerequisites,
    /// Running the install strategies.
    Install,
    /// Static or interactive verification of the installed binary.
    Verification,
}

/// Broad classes of failure.
///
/// Only [`ErrorCategory::TransientInstall`] failures are recovered from, and
/// only inside the orchestrator; anything that reaches the caller is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorCategory {
    Configuration,
    TransientInstall,
    Provisioning,
    Verification,
}

/// Errors that end a provisioning run.
///
/// # Example
///
/// ```rust
/// use cli_provisioner::ProvisionError;
///
/// fn report(error: &ProvisionError) {
///     eprintln!("[{}] {}", error.stage(), error);
///     eprintln!("To fix: {}", error.fix_suggestion());
/// }
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProvisionError {
    /// The requested version is neither a keyword nor `v?N.N.N[-suffix]`.
    #[error("InvalidVersion: '{input}' is not 'latest', 'prerelease' or a version like v1.2.3")]
    InvalidVersion {
        /// The rejected input.
        input: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The host operating system is not one of linux, macos or windows.
    #[error("UnsupportedPlatform: {os}")]
    UnsupportedPlatform {
        /// The operating system reported by the host.
        os: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The host CPU architecture is not one of x64 or arm64.
    #[error("UnsupportedArchitecture: {arch}")]
    UnsupportedArchitecture {
        /// The architecture reported by the host.
        arch: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// No runtime archive could be found or fetched for the target.
    #[error("RuntimeResolutionFailed: {message}")]
    RuntimeResolutionFailed {
        /// What went wrong while resolving the archive.
        message: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The runtime or package manager is still below the minimum after one
    /// installation attempt.
    #[error("PrerequisiteUnavailable: {name} requires major {required}+, found {found}")]
    PrerequisiteUnavailable {
        /// Which prerequisite failed (e.g. "node").
        name: String,
        /// Minimum major version.
        required: u64,
        /// What the last probe reported.
        found: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// Every install strategy failed.
    #[error("InstallationFailed: all install strategies failed ({})", summarize_outcomes(.outcomes))]
    InstallationFailed {
        /// Ordered record of every attempt.
        outcomes: Vec<InstallOutcome>,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The installed binary is not on the search path.
    #[error("BinaryNotFound: '{binary}' is not on the search path")]
    BinaryNotFound {
        /// The executable name that was looked up.
        binary: String,
        /// The search path that was used.
        search_path: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The binary reports a different version than the one requested.
    #[error("VersionMismatch: requested {requested}, binary reported '{reported}'")]
    VersionMismatch {
        /// The requested version with any leading "v" removed.
        requested: String,
        /// The raw version output of the binary.
        reported: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The binary could not run, either for the version query or for the
    /// interactive session.
    #[error("ProcessStartupFailed: {message}")]
    ProcessStartupFailed {
        /// Description of the failure.
        message: String,
        /// Exit code, if the process ran at all.
        exit_code: Option<i32>,
        /// Any output that was captured.
        output: Option<String>,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The interactive session never showed a logged-in banner.
    #[error("InteractiveHandshakeNotObserved ({cause}); transcript:\n{transcript}")]
    InteractiveHandshakeNotObserved {
        /// Everything the binary wrote to the terminal.
        transcript: String,
        /// How the session ended.
        cause: ExitCause,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },
}

fn summarize_outcomes(outcomes: &[InstallOutcome]) -> String {
    outcomes
        .iter()
        .map(|o| {
            format!(
                "{}: {}",
                o.strategy,
                o.error_detail.as_deref().unwrap_or("no detail")
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

impl ProvisionError {
    /// Get an actionable suggestion for fixing this error.
    pub fn fix_suggestion(&self) -> &str {
        match self {
            Self::InvalidVersion { fix, .. } => fix,
            Self::UnsupportedPlatform { fix, .. } => fix,
            Self::UnsupportedArchitecture { fix, .. } => fix,
            Self::RuntimeResolutionFailed { fix, .. } => fix,
            Self::PrerequisiteUnavailable { fix, .. } => fix,
            Self::InstallationFailed { fix, .. } => fix,
            Self::BinaryNotFound { fix, .. } => fix,
            Self::VersionMismatch { fix, .. } => fix,
            Self::ProcessStartupFailed { fix, .. } => fix,
            Self::InteractiveHandshakeNotObserved { fix, .. } => fix,
        }
    }

    /// The stage this error was raised from.
    pub fn stage(&self) -> Stage {
        match self {
            Self::InvalidVersion { .. } => Stage::Configuration,
            Self::UnsupportedPlatform { .. } | Self::UnsupportedArchitecture { .. } => {
                Stage::Platform
            }
            Self::RuntimeResolutionFailed { .. } | Self::PrerequisiteUnavailable { .. } => {
                Stage::Prerequisites
            }
            Self::InstallationFailed { .. } => Stage::Install,
            Self::BinaryNotFound { .. }
            | Self::VersionMismatch { .. }
            | Self::ProcessStartupFailed { .. }
            | Self::InteractiveHandshakeNotObserved { .. } => Stage::Verification,
        }
    }

    /// The failure class this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self.stage() {
            Stage::Configuration | Stage::Platform => ErrorCategory::Configuration,
            Stage::Prerequisites => ErrorCategory::Provisioning,
            Stage::Install => ErrorCategory::TransientInstall,
            Stage::Verification => ErrorCategory::Verification,
        }
    }
}
