//! Child process execution.
//!
//! Every external command a run needs (`node --version`, `npm install -g`,
//! the install script, the tool's version query) goes through a
//! [`ProcessRunner`], so stages can be exercised against a fake without
//! spawning anything.
//!
//! - [`find_executable`]: search-path lookup against a [`RunContext`]
//! - [`SystemRunner`]: the real runner on `tokio::process`

mod path_finder;
mod runner;

pub use path_finder::find_executable;
pub use runner::SystemRunner;

use crate::RunContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A command ready for execution.
///
/// # Example
///
/// ```rust
/// use cli_provisioner::StructuredCommand;
///
/// let cmd = StructuredCommand::new("npm", ["install", "-g", "@github/copilot"]);
/// assert_eq!(cmd.display(), "npm install -g @github/copilot");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredCommand {
    /// Program name (looked up on the run's search path) or path.
    pub program: String,

    /// Arguments to pass to the program.
    pub args: Vec<String>,

    /// Extra environment variables, applied after the run context's.
    pub env_vars: Vec<(String, String)>,
}

impl StructuredCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            env_vars: vec![],
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Shell-like rendering for logs. Environment values are not included.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was ended by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A zero-exit output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed output with the given exit code and stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout when non-empty, stderr otherwise (some tools print their
    /// version to stderr).
    pub fn preferred_output(&self) -> &str {
        if self.stdout.trim().is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }

    /// The last `max_lines` lines of stderr (stdout if stderr is empty).
    pub fn tail(&self, max_lines: usize) -> String {
        let source = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        let lines: Vec<&str> = source.trim_end().lines().collect();
        let start = lines.len().saturating_sub(max_lines);
        lines[start..].join("\n")
    }
}

/// Why a command could not produce a [`CommandOutput`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RunError {
    #[error("'{program}' not found on the search path")]
    NotFound { program: String },

    #[error("permission denied running '{program}': {message}")]
    PermissionDenied { program: String, message: String },

    #[error("'{program}' timed out after {duration:?}")]
    Timeout { program: String, duration: Duration },

    #[error("failed to run '{program}': {message}")]
    Io { program: String, message: String },
}

/// Locates and runs external commands within a [`RunContext`].
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Resolve an executable name on the context's search path.
    fn locate(&self, name: &str, ctx: &RunContext) -> Option<PathBuf>;

    /// Run a command to completion, capturing its output.
    ///
    /// A non-zero exit is reported through [`CommandOutput::exit_code`],
    /// not as an error.
    async fn run(
        &self,
        command: &StructuredCommand,
        ctx: &RunContext,
        timeout: Duration,
    ) -> Result<CommandOutput, RunError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_program_and_args() {
        let cmd = StructuredCommand::new("bash", ["/tmp/install.sh"]).env("VERSION", "1.0.0");
        assert_eq!(cmd.display(), "bash /tmp/install.sh");
        assert_eq!(cmd.env_vars, vec![("VERSION".to_string(), "1.0.0".to_string())]);
    }

    #[test]
    fn test_preferred_output_falls_back_to_stderr() {
        let out = CommandOutput {
            exit_code: Some(0),
            stdout: "  \n".to_string(),
            stderr: "v22.11.0\n".to_string(),
        };
        assert_eq!(out.preferred_output(), "v22.11.0\n");
        assert_eq!(CommandOutput::ok("1.0.0").preferred_output(), "1.0.0");
    }

    #[test]
    fn test_tail_keeps_last_lines() {
        let out = CommandOutput::failed(1, "a\nb\nc\nd\n");
        assert_eq!(out.tail(2), "c\nd");
        assert_eq!(out.tail(10), "a\nb\nc\nd");
        assert!(!out.success());
    }
}
