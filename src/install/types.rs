//! Records of install strategy attempts.

use crate::process::{CommandOutput, RunError};
use serde::Serialize;

/// The install strategies, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Global install from the package registry.
    PackageManager,
    /// Downloaded shell install script.
    Script,
}

/// Result of one strategy attempt.
///
/// # Example
///
/// ```rust
/// use cli_provisioner::{InstallOutcome, StrategyKind};
///
/// let outcome = InstallOutcome::failed(StrategyKind::Script, "HTTP 404");
/// assert!(!outcome.succeeded);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallOutcome {
    pub strategy: StrategyKind,
    pub succeeded: bool,
    /// What went wrong, for failed attempts.
    pub error_detail: Option<String>,
}

impl InstallOutcome {
    pub fn succeeded(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            succeeded: true,
            error_detail: None,
        }
    }

    pub fn failed(strategy: StrategyKind, detail: impl Into<String>) -> Self {
        Self {
            strategy,
            succeeded: false,
            error_detail: Some(detail.into()),
        }
    }

    /// Turn the result of an installer command into an outcome.
    pub(crate) fn from_command(
        strategy: StrategyKind,
        result: Result<CommandOutput, RunError>,
    ) -> Self {
        match result {
            Ok(output) if output.success() => Self::succeeded(strategy),
            Ok(output) => Self::failed(strategy, describe_failure(&output)),
            Err(e) => Self::failed(strategy, e.to_string()),
        }
    }
}

/// Summarize a failed installer run, flagging likely network failures.
fn describe_failure(output: &CommandOutput) -> String {
    let stderr = &output.stderr;
    let is_network = stderr.contains("network")
        || stderr.contains("connection")
        || stderr.contains("resolve")
        || stderr.contains("ETIMEDOUT")
        || stderr.contains("ENOTFOUND")
        || stderr.contains("ECONNRESET");

    let code = output
        .exit_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string());
    let prefix = if is_network {
        format!("network error (exit {code})")
    } else {
        format!("exit {code}")
    };
    let tail = output.tail(20);
    if tail.is_empty() {
        prefix
    } else {
        format!("{prefix}: {tail}")
    }
}
