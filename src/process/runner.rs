//! Process execution on `tokio::process`.

use super::{find_executable, CommandOutput, ProcessRunner, RunError, StructuredCommand};
use crate::RunContext;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    fn locate(&self, name: &str, ctx: &RunContext) -> Option<PathBuf> {
        find_executable(name, ctx)
    }

    async fn run(
        &self,
        command: &StructuredCommand,
        ctx: &RunContext,
        limit: Duration,
    ) -> Result<CommandOutput, RunError> {
        let program = self
            .locate(&command.program, ctx)
            .ok_or_else(|| RunError::NotFound {
                program: command.program.clone(),
            })?;

        tracing::debug!(command = %command.display(), "running");

        let mut cmd = Command::new(&program);
        cmd.args(&command.args)
            .envs(ctx.command_env())
            .envs(command.env_vars.iter().cloned())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = timeout(limit, cmd.output())
            .await
            .map_err(|_| RunError::Timeout {
                program: command.program.clone(),
                duration: limit,
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    RunError::PermissionDenied {
                        program: command.program.clone(),
                        message: e.to_string(),
                    }
                } else {
                    RunError::Io {
                        program: command.program.clone(),
                        message: e.to_string(),
                    }
                }
            })?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
