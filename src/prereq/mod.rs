//! Runtime prerequisite provisioning.
//!
//! The package-manager install strategy needs a recent Node.js and npm. This
//! module probes for them on the run's search path and, when they are missing
//! or too old, installs the latest release of the required major line from
//! the Node.js distribution index.
//!
//! The install is attempted once. If the re-probe still falls short the run
//! fails with [`ProvisionError::PrerequisiteUnavailable`]; downloading the
//! same release again would not change the outcome.

mod archive;
mod probe;

pub use probe::RuntimeCheck;

use crate::download::Downloader;
use crate::process::{ProcessRunner, StructuredCommand};
use crate::{ProvisionError, ProvisionOptions, RunContext, TargetSpec};
use archive::{find_archive, locate_executable_dir, release_folder};
use async_trait::async_trait;
use probe::{parse_major, probe_version};
use std::path::PathBuf;
use std::sync::Arc;

const RUNTIME: &str = "node";
const PACKAGE_MANAGER: &str = "npm";

/// Ensures the execution runtime is usable before installing the tool.
#[async_trait]
pub trait RuntimePrerequisite: Send + Sync {
    /// Make sure the runtime and package manager meet their minimum major
    /// versions, installing the runtime into `ctx` if needed.
    async fn ensure(
        &self,
        target: &TargetSpec,
        ctx: &mut RunContext,
    ) -> Result<RuntimeCheck, ProvisionError>;
}

/// [`RuntimePrerequisite`] for Node.js and npm.
pub struct NodeRuntime {
    runner: Arc<dyn ProcessRunner>,
    downloader: Arc<dyn Downloader>,
    options: ProvisionOptions,
}

impl NodeRuntime {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        downloader: Arc<dyn Downloader>,
        options: ProvisionOptions,
    ) -> Self {
        Self {
            runner,
            downloader,
            options,
        }
    }

    async fn check(&self, ctx: &RunContext) -> RuntimeCheck {
        let timeout = self.options.probe_timeout;
        let runtime = probe_version(self.runner.as_ref(), RUNTIME, ctx, timeout).await;
        let package_manager =
            probe_version(self.runner.as_ref(), PACKAGE_MANAGER, ctx, timeout).await;
        RuntimeCheck::evaluate(
            runtime,
            package_manager,
            self.options.min_runtime_major,
            self.options.min_pkg_mgr_major,
        )
    }

    /// The configured runtime directory, or a new directory that outlives
    /// the run so the runtime stays usable by later workflow steps.
    fn install_root(&self, target: &TargetSpec) -> Result<PathBuf, ProvisionError> {
        if let Some(dir) = &self.options.runtime_dir {
            return Ok(dir.clone());
        }
        tempfile::Builder::new()
            .prefix(&format!("node-v{}-{}-", self.options.min_runtime_major, target))
            .tempdir()
            .map(tempfile::TempDir::keep)
            .map_err(|e| resolution_failed(format!("creating runtime directory: {e}")))
    }

    /// Download, verify and unpack the pinned runtime release, then put its
    /// executables on the search path.
    async fn install_runtime(
        &self,
        target: &TargetSpec,
        ctx: &mut RunContext,
    ) -> Result<(), ProvisionError> {
        let release_url = format!(
            "{}/latest-v{}.x",
            self.options.node_dist_base_url.trim_end_matches('/'),
            self.options.min_runtime_major
        );
        let manifest_url = format!("{release_url}/SHASUMS256.txt");

        let manifest = self
            .downloader
            .fetch_text(&manifest_url)
            .await
            .map_err(|e| resolution_failed(e.to_string()))?;
        let entry = find_archive(&manifest, target).ok_or_else(|| {
            resolution_failed(format!(
                "no archive ending in '{}' listed in {manifest_url}",
                target.node_archive_suffix()
            ))
        })?;
        tracing::info!(archive = %entry.file_name, "installing runtime");

        let root = self.install_root(target)?;
        let extracted = root.join("extracted");
        if extracted.exists() {
            std::fs::remove_dir_all(&extracted).map_err(|e| {
                resolution_failed(format!("clearing {}: {e}", extracted.display()))
            })?;
        }
        std::fs::create_dir_all(&extracted).map_err(|e| {
            resolution_failed(format!("creating {}: {e}", extracted.display()))
        })?;

        let archive_path = root.join(&entry.file_name);
        let actual = self
            .downloader
            .fetch_to_file(&format!("{release_url}/{}", entry.file_name), &archive_path)
            .await
            .map_err(|e| resolution_failed(e.to_string()))?;
        if actual != entry.sha256 {
            return Err(resolution_failed(format!(
                "checksum mismatch for {} (expected {}, got {actual})",
                entry.file_name, entry.sha256
            )));
        }

        let flags = if entry.file_name.ends_with(".zip") {
            "-xf"
        } else {
            "-xzf"
        };
        let extract = StructuredCommand::new(
            "tar",
            [
                flags.to_string(),
                archive_path.display().to_string(),
                "-C".to_string(),
                extracted.display().to_string(),
            ],
        );
        let output = self
            .runner
            .run(&extract, ctx, self.options.install_timeout)
            .await
            .map_err(|e| resolution_failed(e.to_string()))?;
        if !output.success() {
            return Err(resolution_failed(format!(
                "extracting {} failed: {}",
                entry.file_name,
                output.tail(10)
            )));
        }

        let bin_dir = locate_executable_dir(&extracted, release_folder(&entry.file_name))
            .map_err(|e| resolution_failed(format!("reading {}: {e}", extracted.display())))?;
        tracing::info!(dir = %bin_dir.display(), "runtime added to search path");
        ctx.prepend_path(bin_dir);
        Ok(())
    }

    fn unavailable(&self, check: &RuntimeCheck) -> ProvisionError {
        let runtime_ok = check
            .runtime_version
            .as_deref()
            .and_then(parse_major)
            .is_some_and(|major| major >= self.options.min_runtime_major);
        let (name, required, found) = if runtime_ok {
            (
                PACKAGE_MANAGER,
                self.options.min_pkg_mgr_major,
                &check.package_manager_version,
            )
        } else {
            (RUNTIME, self.options.min_runtime_major, &check.runtime_version)
        };
        ProvisionError::PrerequisiteUnavailable {
            name: name.to_string(),
            required,
            found: found.clone().unwrap_or_else(|| "nothing".to_string()),
            fix: format!(
                "Install Node.js {}+ with npm {}+ before this step (e.g. actions/setup-node)",
                self.options.min_runtime_major, self.options.min_pkg_mgr_major
            ),
        }
    }
}

fn resolution_failed(message: String) -> ProvisionError {
    ProvisionError::RuntimeResolutionFailed {
        message,
        fix: "Check network access to the Node.js download site, or install Node.js before this step"
            .to_string(),
    }
}

#[async_trait]
impl RuntimePrerequisite for NodeRuntime {
    async fn ensure(
        &self,
        target: &TargetSpec,
        ctx: &mut RunContext,
    ) -> Result<RuntimeCheck, ProvisionError> {
        let before = self.check(ctx).await;
        if before.satisfies_minimums {
            tracing::info!(
                node = ?before.runtime_version,
                npm = ?before.package_manager_version,
                "runtime prerequisites met"
            );
            return Ok(before);
        }

        tracing::warn!(
            node = ?before.runtime_version,
            npm = ?before.package_manager_version,
            "runtime prerequisites not met, installing node {}.x",
            self.options.min_runtime_major
        );
        self.install_runtime(target, ctx).await?;

        let after = self.check(ctx).await;
        if !after.satisfies_minimums {
            return Err(self.unavailable(&after));
        }
        Ok(after)
    }
}
