//! Version probing for the runtime and package manager.

use crate::process::{ProcessRunner, StructuredCommand};
use crate::RunContext;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use std::time::Duration;

fn major_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^v?(\d+)").expect("Invalid major version regex"))
}

/// Parse the major version from `--version` output such as `v20.11.1` or
/// `10.2.4`.
pub(crate) fn parse_major(output: &str) -> Option<u64> {
    major_re()
        .captures(output.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Snapshot of the runtime and package manager found on the search path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeCheck {
    /// Trimmed `node --version` output, `None` if node is unavailable.
    pub runtime_version: Option<String>,

    /// Trimmed `npm --version` output, `None` if npm is unavailable.
    pub package_manager_version: Option<String>,

    pub satisfies_minimums: bool,
}

impl RuntimeCheck {
    pub(crate) fn evaluate(
        runtime_version: Option<String>,
        package_manager_version: Option<String>,
        min_runtime_major: u64,
        min_pkg_mgr_major: u64,
    ) -> Self {
        let meets = |version: &Option<String>, min: u64| {
            version
                .as_deref()
                .and_then(parse_major)
                .is_some_and(|major| major >= min)
        };
        let satisfies_minimums = meets(&runtime_version, min_runtime_major)
            && meets(&package_manager_version, min_pkg_mgr_major);
        Self {
            runtime_version,
            package_manager_version,
            satisfies_minimums,
        }
    }
}

/// Run `<program> --version` and return its trimmed output, or `None` when
/// the program is missing or fails.
pub(crate) async fn probe_version(
    runner: &dyn ProcessRunner,
    program: &str,
    ctx: &RunContext,
    timeout: Duration,
) -> Option<String> {
    runner.locate(program, ctx)?;
    let command = StructuredCommand::new(program, ["--version"]);
    match runner.run(&command, ctx, timeout).await {
        Ok(output) if output.success() => {
            let version = output.preferred_output().trim().to_string();
            tracing::debug!(program, version = %version, "probed");
            (!version.is_empty()).then_some(version)
        }
        Ok(output) => {
            tracing::debug!(program, exit_code = ?output.exit_code, "version probe failed");
            None
        }
        Err(e) => {
            tracing::debug!(program, error = %e, "version probe failed");
            None
        }
    }
}
