//! Sequencing of a provisioning run.
//!
//! resolve platform -> parse version -> ensure prerequisites -> install
//! strategies in order -> verify. Every stage runs to completion before the
//! next starts, and the first terminal error ends the run.

use crate::download::{DownloadError, HttpDownloader};
use crate::install::{InstallOutcome, InstallStrategy, PackageManagerInstall, ScriptInstall};
use crate::prereq::{NodeRuntime, RuntimeCheck, RuntimePrerequisite};
use crate::process::SystemRunner;
use crate::session::NativePtyLauncher;
use crate::verify::VerificationEngine;
use crate::{
    ProvisionError, ProvisionOptions, ProvisionProgress, RunContext, TargetSpec, ToolSpec,
    VersionRequest,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// The inputs of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Host OS identifier (`linux`, `macos`, `darwin`, `windows`, ...).
    pub os: String,
    /// Host architecture identifier (`x86_64`, `x64`, `aarch64`, `arm64`).
    pub arch: String,
    /// `latest`, `prerelease` or `v?N.N.N[-suffix]`.
    pub version: String,
    /// Credential for interactive verification. Static verification when
    /// `None` or empty.
    pub credential: Option<String>,
}

impl RunRequest {
    /// A request for the machine this process runs on.
    pub fn for_host(version: impl Into<String>, credential: Option<String>) -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            version: version.into(),
            credential,
        }
    }
}

/// Everything a successful run established.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    /// Version reported by the installed binary.
    pub version: String,
    /// Resolved path of the installed binary.
    pub path: PathBuf,
    pub target: TargetSpec,
    pub request: VersionRequest,
    pub runtime: RuntimeCheck,
    /// Every install attempt, in order.
    pub outcomes: Vec<InstallOutcome>,
    pub interactive_confirmed: bool,
    pub handshake: Option<String>,
    /// Search-path entries this run added.
    pub added_paths: Vec<PathBuf>,
}

/// Runs the stages of a provisioning run in order.
pub struct Orchestrator {
    prerequisite: Arc<dyn RuntimePrerequisite>,
    strategies: Vec<Arc<dyn InstallStrategy>>,
    engine: VerificationEngine,
    credential_env: String,
}

impl Orchestrator {
    /// Assemble an orchestrator from its parts. `strategies` are tried in
    /// the given order.
    pub fn new(
        prerequisite: Arc<dyn RuntimePrerequisite>,
        strategies: Vec<Arc<dyn InstallStrategy>>,
        engine: VerificationEngine,
        credential_env: impl Into<String>,
    ) -> Self {
        Self {
            prerequisite,
            strategies,
            engine,
            credential_env: credential_env.into(),
        }
    }

    /// Wire the real process runner, HTTP downloader and PTY launcher.
    pub fn with_defaults(tool: ToolSpec, options: ProvisionOptions) -> Result<Self, DownloadError> {
        let runner = Arc::new(SystemRunner);
        let downloader = Arc::new(HttpDownloader::new(options.download_timeout)?);

        let engine = VerificationEngine::new(
            runner.clone(),
            Arc::new(NativePtyLauncher),
            tool.clone(),
            &options,
        );
        let strategies: Vec<Arc<dyn InstallStrategy>> = vec![
            Arc::new(PackageManagerInstall::new(
                runner.clone(),
                tool.clone(),
                options.install_timeout,
            )),
            Arc::new(ScriptInstall::new(
                runner.clone(),
                downloader.clone(),
                tool.clone(),
                options.install_prefix.clone(),
                options.install_timeout,
            )),
        ];
        let credential_env = tool.credential_env;
        let prerequisite = Arc::new(NodeRuntime::new(runner, downloader, options));

        Ok(Self::new(prerequisite, strategies, engine, credential_env))
    }

    /// Provision the tool.
    ///
    /// Search-path changes and the exported credential are recorded in
    /// `ctx`, so the caller can publish them once the run succeeds.
    pub async fn run<F>(
        &self,
        request: &RunRequest,
        ctx: &mut RunContext,
        on_progress: F,
    ) -> Result<ProvisionReport, ProvisionError>
    where
        F: Fn(ProvisionProgress) + Send + Sync,
    {
        let target = TargetSpec::resolve(&request.os, &request.arch)?;
        tracing::info!(%target, "platform resolved");
        on_progress(ProvisionProgress::PlatformResolved { target });

        let version = VersionRequest::parse(&request.version)?;
        tracing::info!(request = %version, "version requested");

        if let Some(credential) = request.credential.as_deref().filter(|c| !c.is_empty()) {
            ctx.export(self.credential_env.as_str(), credential);
        }

        on_progress(ProvisionProgress::CheckingPrerequisites);
        let runtime = self.prerequisite.ensure(&target, ctx).await?;

        let outcomes = self.install(&version, &target, ctx, &on_progress).await;
        if !outcomes.last().is_some_and(|o| o.succeeded) {
            return Err(ProvisionError::InstallationFailed {
                outcomes,
                fix: "Check network access to the package registry and the install script host"
                    .to_string(),
            });
        }

        let interactive = ctx
            .exported(&self.credential_env)
            .is_some_and(|c| !c.is_empty());
        on_progress(ProvisionProgress::Verifying { interactive });
        let verified = self.engine.verify(&version, ctx).await?;

        tracing::info!(
            version = %verified.resolved_version,
            path = %verified.resolved_path.display(),
            "provisioning complete"
        );
        on_progress(ProvisionProgress::Completed {
            version: verified.resolved_version.clone(),
        });

        Ok(ProvisionReport {
            version: verified.resolved_version,
            path: verified.resolved_path,
            target,
            request: version,
            runtime,
            outcomes,
            interactive_confirmed: verified.interactive_confirmed,
            handshake: verified.handshake,
            added_paths: ctx.added_dirs().map(PathBuf::from).collect(),
        })
    }

    /// Try the strategies in order, stopping at the first success.
    async fn install<F>(
        &self,
        version: &VersionRequest,
        target: &TargetSpec,
        ctx: &mut RunContext,
        on_progress: &F,
    ) -> Vec<InstallOutcome>
    where
        F: Fn(ProvisionProgress) + Send + Sync,
    {
        let mut outcomes: Vec<InstallOutcome> = Vec::new();
        for strategy in &self.strategies {
            let kind = strategy.kind();
            if !strategy.supports(target) {
                tracing::info!(strategy = %kind, %target, "strategy not supported here, skipping");
                continue;
            }
            if let Some(previous) = outcomes.last() {
                tracing::warn!(
                    from = %previous.strategy,
                    to = %kind,
                    detail = previous.error_detail.as_deref().unwrap_or_default(),
                    "install failed, falling back"
                );
                on_progress(ProvisionProgress::FallingBack {
                    from: previous.strategy,
                    to: kind,
                });
            }

            on_progress(ProvisionProgress::Installing { strategy: kind });
            let outcome = strategy.attempt(version, target, ctx).await;
            let succeeded = outcome.succeeded;
            outcomes.push(outcome);
            if succeeded {
                tracing::info!(strategy = %kind, "install succeeded");
                break;
            }
        }
        outcomes
    }
}
