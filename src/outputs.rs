//! Publishing a run's results to the CI workflow.
//!
//! Uses the GitHub Actions file commands: step outputs go to the file named
//! by `GITHUB_OUTPUT`, search-path entries to `GITHUB_PATH` and exported
//! variables to `GITHUB_ENV`. Outside a workflow the outputs are printed as
//! `key=value` lines and the other two are skipped.

use crate::{ProvisionError, ProvisionReport, RunContext};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Destinations of the workflow file commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowFiles {
    pub output: Option<PathBuf>,
    pub path: Option<PathBuf>,
    pub env: Option<PathBuf>,
}

impl WorkflowFiles {
    /// Read the file locations from the environment.
    pub fn from_env() -> Self {
        let var = |key: &str| {
            std::env::var_os(key)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };
        Self {
            output: var("GITHUB_OUTPUT"),
            path: var("GITHUB_PATH"),
            env: var("GITHUB_ENV"),
        }
    }

    /// Publish `version` and `path`, the search-path entries the run added
    /// and, when one was exported, the credential under `credential_env`.
    ///
    /// The credential is masked in the workflow log before it is written
    /// anywhere. `stdout` receives workflow commands and, outside a
    /// workflow, the outputs.
    pub fn publish(
        &self,
        report: &ProvisionReport,
        ctx: &RunContext,
        credential_env: &str,
        stdout: &mut dyn Write,
    ) -> io::Result<()> {
        if let Some(credential) = ctx.exported(credential_env).filter(|c| !c.is_empty()) {
            for line in credential.lines().filter(|l| !l.is_empty()) {
                writeln!(stdout, "::add-mask::{line}")?;
            }
            if let Some(file) = &self.env {
                append(file, &env_entry(credential_env, credential))?;
            }
        }

        let outputs = format!(
            "version={}\npath={}\n",
            report.version,
            report.path.display()
        );
        match &self.output {
            Some(file) => append(file, &outputs)?,
            None => stdout.write_all(outputs.as_bytes())?,
        }

        if let Some(file) = &self.path {
            let mut lines = String::new();
            for dir in &report.added_paths {
                lines.push_str(&format!("{}\n", dir.display()));
            }
            if !lines.is_empty() {
                append(file, &lines)?;
            }
        }
        tracing::debug!(?self, "outputs published");
        Ok(())
    }
}

/// An `::error::` workflow command for a failed run, so the failure shows up
/// as an annotation on the workflow summary.
pub fn error_annotation(error: &ProvisionError) -> String {
    format!(
        "::error title={}::{}",
        escape_command(&error.stage().to_string()),
        escape_command(&format!("{error}\nTo fix: {}", error.fix_suggestion()))
    )
}

fn escape_command(text: &str) -> String {
    text.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// A `GITHUB_ENV` entry. Multi-line values use the delimiter form.
fn env_entry(key: &str, value: &str) -> String {
    if value.contains('\n') {
        let mut delimiter = String::from("ghadelimiter");
        while value.contains(&delimiter) {
            delimiter.push('_');
        }
        format!("{key}<<{delimiter}\n{value}\n{delimiter}\n")
    } else {
        format!("{key}={value}\n")
    }
}

fn append(file: &Path, content: &str) -> io::Result<()> {
    let mut handle = OpenOptions::new().create(true).append(true).open(file)?;
    handle.write_all(content.as_bytes())
}
