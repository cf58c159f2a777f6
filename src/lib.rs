//! # cli-provisioner
//!
//! Installs an interactive command-line tool onto a CI runner and proves it
//! actually starts up.
//!
//! A run resolves the host platform, makes sure Node.js and npm are recent
//! enough (downloading Node.js if they are not), installs the tool with
//! `npm install -g` and falls back to the tool's install script, then
//! verifies the binary. Without a credential verification is static: the
//! binary must be on the search path and report the requested version. With
//! a credential the binary is also started in a pseudo-terminal and must
//! print a logged-in banner before it is stopped.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cli_provisioner::{Orchestrator, ProvisionOptions, RunContext, RunRequest, ToolSpec};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let orchestrator =
//!         Orchestrator::with_defaults(ToolSpec::default(), ProvisionOptions::default()).unwrap();
//!     let mut ctx = RunContext::from_process_env();
//!     let request = RunRequest::for_host("latest", None);
//!
//!     match orchestrator.run(&request, &mut ctx, |p| println!("{}", p.description())).await {
//!         Ok(report) => println!("{} at {}", report.version, report.path.display()),
//!         Err(e) => eprintln!("{e}\nTo fix: {}", e.fix_suggestion()),
//!     }
//! }
//! ```

mod context;
mod download;
mod error;
mod install;
mod options;
mod orchestrator;
pub mod outputs;
mod platform;
mod prereq;
pub mod process;
mod progress;
pub mod session;
pub mod telemetry;
mod tool;
mod verify;
mod version_request;

pub use context::RunContext;
pub use download::{DownloadError, Downloader, HttpDownloader};
pub use error::{ErrorCategory, ProvisionError, Stage};
pub use install::{InstallOutcome, InstallStrategy, PackageManagerInstall, ScriptInstall, StrategyKind};
pub use options::{ProvisionOptions, SessionTimings};
pub use orchestrator::{Orchestrator, ProvisionReport, RunRequest};
pub use platform::{Arch, Platform, TargetSpec};
pub use prereq::{NodeRuntime, RuntimeCheck, RuntimePrerequisite};
pub use process::{CommandOutput, ProcessRunner, RunError, StructuredCommand, SystemRunner};
pub use progress::ProvisionProgress;
pub use session::{classify, strip_ansi, Handshake, NativePtyLauncher, PtyLauncher};
pub use tool::ToolSpec;
pub use verify::{VerificationEngine, VerificationResult};
pub use version_request::VersionRequest;
