//! Fallback install through the tool's shell install script.

use super::{InstallOutcome, InstallStrategy, StrategyKind};
use crate::download::Downloader;
use crate::process::{ProcessRunner, StructuredCommand};
use crate::{RunContext, TargetSpec, ToolSpec, VersionRequest};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Downloads the install script and runs it into a user-writable prefix.
///
/// The script receives `PREFIX` (so no elevated privileges are needed) and,
/// for exact version requests only, `VERSION`. On success `<PREFIX>/bin` is
/// appended to the run's search path.
pub struct ScriptInstall {
    runner: Arc<dyn ProcessRunner>,
    downloader: Arc<dyn Downloader>,
    tool: ToolSpec,
    prefix: Option<PathBuf>,
    timeout: Duration,
}

impl ScriptInstall {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        downloader: Arc<dyn Downloader>,
        tool: ToolSpec,
        prefix: Option<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            downloader,
            tool,
            prefix,
            timeout,
        }
    }

    fn prefix(&self, ctx: &RunContext) -> Option<PathBuf> {
        self.prefix
            .clone()
            .or_else(|| ctx.home().map(|home| home.join(".local")))
    }

    pub(crate) fn command(
        &self,
        script: &Path,
        prefix: &Path,
        request: &VersionRequest,
    ) -> StructuredCommand {
        let command = StructuredCommand::new("bash", [script.display().to_string()])
            .env("PREFIX", prefix.display().to_string());
        match request.exact() {
            Some(version) => command.env("VERSION", version),
            None => command,
        }
    }
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[async_trait]
impl InstallStrategy for ScriptInstall {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Script
    }

    fn supports(&self, target: &TargetSpec) -> bool {
        target.platform().supports_install_script()
    }

    async fn attempt(
        &self,
        request: &VersionRequest,
        target: &TargetSpec,
        ctx: &mut RunContext,
    ) -> InstallOutcome {
        if !self.supports(target) {
            return InstallOutcome::failed(
                self.kind(),
                format!("install script is not supported on {}", target.platform()),
            );
        }
        let Some(prefix) = self.prefix(ctx) else {
            return InstallOutcome::failed(self.kind(), "no install prefix and no home directory");
        };
        if let Err(e) = std::fs::create_dir_all(&prefix) {
            return InstallOutcome::failed(
                self.kind(),
                format!("creating {}: {e}", prefix.display()),
            );
        }

        // Removed when dropped, after the script has finished.
        let script = match tempfile::Builder::new()
            .prefix("install-")
            .suffix(".sh")
            .tempfile()
        {
            Ok(file) => file,
            Err(e) => {
                return InstallOutcome::failed(self.kind(), format!("creating temp file: {e}"))
            }
        };

        tracing::info!(url = %self.tool.install_script_url, "downloading install script");
        if let Err(e) = self
            .downloader
            .fetch_to_file(&self.tool.install_script_url, script.path())
            .await
        {
            return InstallOutcome::failed(self.kind(), e.to_string());
        }
        if let Err(e) = mark_executable(script.path()) {
            return InstallOutcome::failed(self.kind(), format!("chmod install script: {e}"));
        }

        let command = self.command(script.path(), &prefix, request);
        tracing::info!(prefix = %prefix.display(), "running install script");
        let result = self.runner.run(&command, ctx, self.timeout).await;
        let outcome = InstallOutcome::from_command(self.kind(), result);
        if outcome.succeeded {
            ctx.append_path(prefix.join("bin"));
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::DownloadError;
    use crate::process::{CommandOutput, RunError};
    use std::sync::Mutex;

    struct RecordingRunner {
        result: Result<CommandOutput, RunError>,
        seen: Mutex<Vec<StructuredCommand>>,
    }

    #[async_trait]
    impl ProcessRunner for RecordingRunner {
        fn locate(&self, name: &str, _ctx: &RunContext) -> Option<PathBuf> {
            Some(PathBuf::from(name))
        }

        async fn run(
            &self,
            command: &StructuredCommand,
            _ctx: &RunContext,
            _timeout: Duration,
        ) -> Result<CommandOutput, RunError> {
            self.seen.lock().unwrap().push(command.clone());
            self.result.clone()
        }
    }

    struct StaticDownloader {
        fail: bool,
    }

    #[async_trait]
    impl Downloader for StaticDownloader {
        async fn fetch_text(&self, _url: &str) -> Result<String, DownloadError> {
            Ok(String::new())
        }

        async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<String, DownloadError> {
            if self.fail {
                return Err(DownloadError::Status {
                    url: url.to_string(),
                    status: 503,
                });
            }
            std::fs::write(dest, "#!/bin/sh\nexit 0\n").unwrap();
            Ok(String::new())
        }
    }

    fn setup(
        result: Result<CommandOutput, RunError>,
        fail_download: bool,
        prefix: &Path,
    ) -> (ScriptInstall, Arc<RecordingRunner>) {
        let runner = Arc::new(RecordingRunner {
            result,
            seen: Mutex::new(vec![]),
        });
        let install = ScriptInstall::new(
            runner.clone(),
            Arc::new(StaticDownloader {
                fail: fail_download,
            }),
            ToolSpec::default(),
            Some(prefix.to_path_buf()),
            Duration::from_secs(60),
        );
        (install, runner)
    }

    fn linux() -> TargetSpec {
        TargetSpec::resolve("linux", "x86_64").unwrap()
    }

    #[tokio::test]
    async fn test_exact_version_sets_version_and_prefix() {
        let prefix = tempfile::tempdir().unwrap();
        let (install, runner) = setup(Ok(CommandOutput::ok("")), false, prefix.path());
        let mut ctx = RunContext::empty();

        let request = VersionRequest::parse("v0.9.1").unwrap();
        let outcome = install.attempt(&request, &linux(), &mut ctx).await;

        assert!(outcome.succeeded);
        let seen = runner.seen.lock().unwrap();
        assert_eq!(seen[0].program, "bash");
        assert!(seen[0]
            .env_vars
            .contains(&("VERSION".to_string(), "0.9.1".to_string())));
        assert!(seen[0]
            .env_vars
            .contains(&("PREFIX".to_string(), prefix.path().display().to_string())));
        let added: Vec<_> = ctx.added_dirs().collect();
        assert_eq!(added, vec![prefix.path().join("bin").as_path()]);
    }

    #[tokio::test]
    async fn test_latest_does_not_set_version() {
        let prefix = tempfile::tempdir().unwrap();
        let (install, runner) = setup(Ok(CommandOutput::ok("")), false, prefix.path());
        install
            .attempt(&VersionRequest::Latest, &linux(), &mut RunContext::empty())
            .await;
        let seen = runner.seen.lock().unwrap();
        assert!(seen[0].env_vars.iter().all(|(k, _)| k != "VERSION"));
    }

    #[tokio::test]
    async fn test_download_failure_skips_run() {
        let prefix = tempfile::tempdir().unwrap();
        let (install, runner) = setup(Ok(CommandOutput::ok("")), true, prefix.path());
        let mut ctx = RunContext::empty();
        let outcome = install
            .attempt(&VersionRequest::Latest, &linux(), &mut ctx)
            .await;

        assert!(!outcome.succeeded);
        assert!(outcome.error_detail.unwrap().contains("HTTP 503"));
        assert!(runner.seen.lock().unwrap().is_empty());
        assert_eq!(ctx.added_dirs().count(), 0);
    }

    #[tokio::test]
    async fn test_script_failure_leaves_path_alone() {
        let prefix = tempfile::tempdir().unwrap();
        let (install, _) = setup(Ok(CommandOutput::failed(2, "unsupported")), false, prefix.path());
        let mut ctx = RunContext::empty();
        let outcome = install
            .attempt(&VersionRequest::Latest, &linux(), &mut ctx)
            .await;
        assert!(!outcome.succeeded);
        assert_eq!(ctx.added_dirs().count(), 0);
    }

    #[tokio::test]
    async fn test_windows_is_not_supported() {
        let prefix = tempfile::tempdir().unwrap();
        let (install, runner) = setup(Ok(CommandOutput::ok("")), false, prefix.path());
        let windows = TargetSpec::resolve("windows", "x86_64").unwrap();
        assert!(!install.supports(&windows));

        let outcome = install
            .attempt(&VersionRequest::Latest, &windows, &mut RunContext::empty())
            .await;
        assert!(!outcome.succeeded);
        assert!(runner.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_prefix_defaults_to_home_local() {
        let install = ScriptInstall::new(
            Arc::new(RecordingRunner {
                result: Ok(CommandOutput::ok("")),
                seen: Mutex::new(vec![]),
            }),
            Arc::new(StaticDownloader { fail: false }),
            ToolSpec::default(),
            None,
            Duration::from_secs(1),
        );
        let ctx = RunContext::empty().with_home("/home/runner");
        assert_eq!(
            install.prefix(&ctx),
            Some(PathBuf::from("/home/runner/.local"))
        );
        assert_eq!(install.prefix(&RunContext::empty()), None);
    }
}
