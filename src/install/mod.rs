//! Install strategies for the tool.
//!
//! Strategies are tried in a fixed order and the first success wins. A
//! strategy never fails the run by itself: whatever goes wrong is recorded
//! in an [`InstallOutcome`] and the orchestrator moves on to the next one.
//!
//! - [`PackageManagerInstall`]: `npm install -g <package>[@version]`
//! - [`ScriptInstall`]: downloaded install script run with `VERSION` and
//!   `PREFIX` overrides (linux and macos only)

mod package_manager;
mod script;
mod types;

pub use package_manager::PackageManagerInstall;
pub use script::ScriptInstall;
pub use types::{InstallOutcome, StrategyKind};

use crate::{RunContext, TargetSpec, VersionRequest};
use async_trait::async_trait;

/// One way of getting the tool onto the machine.
#[async_trait]
pub trait InstallStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Whether this strategy can run on `target` at all.
    fn supports(&self, target: &TargetSpec) -> bool;

    /// Try to install the requested version. Search-path changes needed to
    /// reach the installed binary are recorded in `ctx`.
    async fn attempt(
        &self,
        request: &VersionRequest,
        target: &TargetSpec,
        ctx: &mut RunContext,
    ) -> InstallOutcome;
}
