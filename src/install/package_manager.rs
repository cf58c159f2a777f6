//! Registry install through npm.

use super::{InstallOutcome, InstallStrategy, StrategyKind};
use crate::process::{ProcessRunner, StructuredCommand};
use crate::{RunContext, TargetSpec, ToolSpec, VersionRequest};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Installs the tool with `npm install -g`.
pub struct PackageManagerInstall {
    runner: Arc<dyn ProcessRunner>,
    tool: ToolSpec,
    timeout: Duration,
}

impl PackageManagerInstall {
    pub fn new(runner: Arc<dyn ProcessRunner>, tool: ToolSpec, timeout: Duration) -> Self {
        Self {
            runner,
            tool,
            timeout,
        }
    }

    pub(crate) fn command(&self, request: &VersionRequest) -> StructuredCommand {
        let reference = self.tool.package_reference(request);
        StructuredCommand::new("npm", ["install", "-g", reference.as_str()])
    }
}

#[async_trait]
impl InstallStrategy for PackageManagerInstall {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PackageManager
    }

    fn supports(&self, _target: &TargetSpec) -> bool {
        true
    }

    async fn attempt(
        &self,
        request: &VersionRequest,
        _target: &TargetSpec,
        ctx: &mut RunContext,
    ) -> InstallOutcome {
        let command = self.command(request);
        tracing::info!(command = %command.display(), "installing from registry");
        let result = self.runner.run(&command, ctx, self.timeout).await;
        InstallOutcome::from_command(self.kind(), result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{CommandOutput, RunError};
    use std::path::PathBuf;
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

    fn strategy(result: Result<CommandOutput, RunError>) -> (PackageManagerInstall, Arc<RecordingRunner>) {
        let runner = Arc::new(RecordingRunner {
            result,
            seen: Mutex::new(vec![]),
        });
        let tool = ToolSpec {
            package: "@acme/cli".to_string(),
            ..Default::default()
        };
        (
            PackageManagerInstall::new(runner.clone(), tool, Duration::from_secs(60)),
            runner,
        )
    }

    fn linux() -> TargetSpec {
        TargetSpec::resolve("linux", "x86_64").unwrap()
    }

    #[tokio::test]
    async fn test_installs_pinned_version() {
        let (install, runner) = strategy(Ok(CommandOutput::ok("added 1 package")));
        let request = VersionRequest::parse("v2.1.0").unwrap();

        let outcome = install
            .attempt(&request, &linux(), &mut RunContext::empty())
            .await;

        assert!(outcome.succeeded);
        assert_eq!(
            runner.seen.lock().unwrap()[0].display(),
            "npm install -g @acme/cli@2.1.0"
        );
    }

    #[tokio::test]
    async fn test_prerelease_uses_dist_tag() {
        let (install, runner) = strategy(Ok(CommandOutput::ok("")));
        install
            .attempt(&VersionRequest::Prerelease, &linux(), &mut RunContext::empty())
            .await;
        assert_eq!(
            runner.seen.lock().unwrap()[0].args,
            vec!["install", "-g", "@acme/cli@prerelease"]
        );
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_an_outcome() {
        let (install, _) = strategy(Ok(CommandOutput::failed(243, "npm ERR! EACCES")));
        let outcome = install
            .attempt(&VersionRequest::Latest, &linux(), &mut RunContext::empty())
            .await;
        assert!(!outcome.succeeded);
        assert_eq!(outcome.strategy, StrategyKind::PackageManager);
        assert!(outcome.error_detail.unwrap().contains("EACCES"));
    }

    #[tokio::test]
    async fn test_timeout_is_an_outcome() {
        let (install, _) = strategy(Err(RunError::Timeout {
            program: "npm".to_string(),
            duration: Duration::from_secs(60),
        }));
        let outcome = install
            .attempt(&VersionRequest::Latest, &linux(), &mut RunContext::empty())
            .await;
        assert!(!outcome.succeeded);
        assert!(outcome.error_detail.unwrap().contains("timed out"));
    }
}
