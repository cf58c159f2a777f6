//! Verification of the installed binary.
//!
//! Without a credential the binary is only resolved on the search path and
//! asked for its version. With a credential exported into the run context the
//! binary is additionally started in a pseudo-terminal, and the run succeeds
//! only if the transcript shows it logged in.

mod parser;

use crate::process::{ProcessRunner, StructuredCommand};
use crate::session::{self, classify, ExitCause, Handshake, LaunchRequest, PtyLauncher};
use crate::{ProvisionError, ProvisionOptions, RunContext, SessionTimings, ToolSpec, VersionRequest};
use parser::{matches_requested, resolved_version};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// What verification established about the installed binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    /// Absolute location of the binary on the run's search path.
    pub resolved_path: PathBuf,

    /// Semantic version from `--version`, or its trimmed output when it has
    /// none.
    pub resolved_version: String,

    /// True only when a credential was supplied and the transcript matched.
    pub interactive_confirmed: bool,

    /// The banner that confirmed the login, e.g. "Logged in as ci-bot".
    pub handshake: Option<String>,
}

/// Static and interactive checks of the installed tool.
pub struct VerificationEngine {
    runner: Arc<dyn ProcessRunner>,
    launcher: Arc<dyn PtyLauncher>,
    tool: ToolSpec,
    probe_timeout: Duration,
    timings: SessionTimings,
}

impl VerificationEngine {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        launcher: Arc<dyn PtyLauncher>,
        tool: ToolSpec,
        options: &ProvisionOptions,
    ) -> Self {
        Self {
            runner,
            launcher,
            tool,
            probe_timeout: options.probe_timeout,
            timings: options.session,
        }
    }

    /// Verify the binary. The mode is chosen by whether the tool's
    /// credential variable is exported (and non-empty) in `ctx`.
    pub async fn verify(
        &self,
        request: &VersionRequest,
        ctx: &RunContext,
    ) -> Result<VerificationResult, ProvisionError> {
        let path = self.resolve_binary(ctx)?;
        tracing::info!(path = %path.display(), "binary resolved");

        let interactive = ctx
            .exported(&self.tool.credential_env)
            .is_some_and(|v| !v.is_empty());
        let handshake = if interactive {
            Some(self.interactive(&path, ctx).await?)
        } else {
            tracing::info!("no credential available, verifying statically");
            None
        };

        let resolved_version = self.check_version(&path, request, ctx).await?;
        Ok(VerificationResult {
            resolved_path: path,
            resolved_version,
            interactive_confirmed: handshake.is_some(),
            handshake: handshake.map(|h| h.phrase),
        })
    }

    fn resolve_binary(&self, ctx: &RunContext) -> Result<PathBuf, ProvisionError> {
        self.runner
            .locate(&self.tool.binary, ctx)
            .ok_or_else(|| ProvisionError::BinaryNotFound {
                binary: self.tool.binary.clone(),
                search_path: ctx.search_path().to_string_lossy().into_owned(),
                fix: format!(
                    "Check the install logs above; the install location of '{}' was not added to PATH",
                    self.tool.binary
                ),
            })
    }

    /// Run `<binary> --version` and compare it to an exact request.
    async fn check_version(
        &self,
        path: &Path,
        request: &VersionRequest,
        ctx: &RunContext,
    ) -> Result<String, ProvisionError> {
        let command =
            StructuredCommand::new(path.display().to_string(), [self.tool.version_flag.as_str()]);
        tracing::debug!(command = %command.display(), "querying version");

        let output = self
            .runner
            .run(&command, ctx, self.probe_timeout)
            .await
            .map_err(|e| ProvisionError::ProcessStartupFailed {
                message: e.to_string(),
                exit_code: None,
                output: None,
                fix: "Make sure the installed binary is executable on this runner".to_string(),
            })?;

        if !output.success() {
            return Err(ProvisionError::ProcessStartupFailed {
                message: format!(
                    "'{}' exited with {}",
                    command.display(),
                    output
                        .exit_code
                        .map(|c| format!("code {c}"))
                        .unwrap_or_else(|| "a signal".to_string())
                ),
                exit_code: output.exit_code,
                output: Some(output.preferred_output().to_string()),
                fix: "Run the command locally to see why the binary fails to start".to_string(),
            });
        }

        let reported = output.preferred_output().trim();
        if let Some(requested) = request.exact() {
            if !matches_requested(reported, requested) {
                return Err(ProvisionError::VersionMismatch {
                    requested: requested.to_string(),
                    reported: reported.to_string(),
                    fix: format!(
                        "Another '{}' may shadow the installed one on PATH, or version {requested} is not published",
                        self.tool.binary
                    ),
                });
            }
        }

        let version = resolved_version(reported);
        tracing::info!(version = %version, "version verified");
        Ok(version)
    }

    /// Start the binary in a terminal and look for a logged-in banner.
    async fn interactive(&self, path: &Path, ctx: &RunContext) -> Result<Handshake, ProvisionError> {
        let request = LaunchRequest {
            program: path.to_path_buf(),
            args: self.tool.interactive_args.clone(),
            cols: self.timings.cols,
            rows: self.timings.rows,
        };
        tracing::info!(
            cols = request.cols,
            rows = request.rows,
            "starting interactive session"
        );

        let pty_session =
            self.launcher
                .launch(&request, ctx)
                .map_err(|e| ProvisionError::ProcessStartupFailed {
                    message: e.to_string(),
                    exit_code: None,
                    output: None,
                    fix: "The runner must be able to allocate a pseudo-terminal".to_string(),
                })?;
        let outcome = session::drive(pty_session, self.timings).await;
        tracing::debug!(
            bytes = outcome.bytes,
            cause = %outcome.cause,
            interrupts = outcome.interrupts_sent,
            "interactive session finished"
        );

        if outcome.never_started() {
            return Err(ProvisionError::ProcessStartupFailed {
                message: format!("{} exited without writing any output", path.display()),
                exit_code: outcome.exit.code.map(|c| c as i32),
                output: None,
                fix: "Run the binary locally; it fails before printing anything".to_string(),
            });
        }

        match classify(&outcome.transcript) {
            Some(handshake) => {
                if outcome.cause == ExitCause::SelfExited && !outcome.exit.success() {
                    tracing::warn!(
                        code = ?outcome.exit.code,
                        "binary logged in but exited with a failure status"
                    );
                }
                tracing::info!(who = %handshake.who, "interactive login confirmed");
                Ok(handshake)
            }
            None => Err(ProvisionError::InteractiveHandshakeNotObserved {
                transcript: outcome.transcript,
                cause: outcome.cause,
                fix: format!(
                    "Check that {} holds a valid credential; the transcript above shows what the tool printed",
                    self.tool.credential_env
                ),
            }),
        }
    }
}
