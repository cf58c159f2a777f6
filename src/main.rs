//! `cli-provisioner`: install a CLI tool on a CI runner and verify it.
//!
//! Every flag also reads an `INPUT_*` variable, so the binary can be used
//! directly as a workflow step.

use clap::Parser;
use cli_provisioner::outputs::{error_annotation, WorkflowFiles};
use cli_provisioner::telemetry::init_tracing;
use cli_provisioner::{Orchestrator, ProvisionOptions, RunContext, RunRequest, ToolSpec};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser)]
#[command(name = "cli-provisioner")]
#[command(about = "Install an interactive CLI onto a CI runner and prove it starts up", long_about = None)]
struct Cli {
    /// Version to install: latest, prerelease or an exact version like v1.2.3
    #[arg(long, env = "INPUT_VERSION", default_value = "latest")]
    version: String,

    /// Credential for interactive verification (static verification when absent)
    #[arg(long, env = "INPUT_CREDENTIAL", hide_env_values = true)]
    credential: Option<String>,

    /// Print the run report as JSON and emit JSON log lines
    #[arg(long, env = "INPUT_JSON")]
    json: bool,

    /// Default log level when RUST_LOG is not set
    #[arg(long, env = "INPUT_LOG_LEVEL", default_value = "info")]
    log_level: Level,

    /// Registry package to install
    #[arg(long, env = "INPUT_PACKAGE")]
    package: Option<String>,

    /// Executable name of the installed tool
    #[arg(long, env = "INPUT_BINARY")]
    binary: Option<String>,

    /// URL of the fallback install script
    #[arg(long, env = "INPUT_INSTALL_SCRIPT_URL")]
    install_script_url: Option<String>,

    /// Environment variable the tool reads its credential from
    #[arg(long, env = "INPUT_CREDENTIAL_ENV")]
    credential_env: Option<String>,

    /// PREFIX for the install script (default: $HOME/.local)
    #[arg(long, env = "INPUT_INSTALL_PREFIX")]
    install_prefix: Option<PathBuf>,
}

impl Cli {
    fn tool(&self) -> ToolSpec {
        let defaults = ToolSpec::default();
        ToolSpec {
            package: self.package.clone().unwrap_or(defaults.package),
            binary: self.binary.clone().unwrap_or(defaults.binary),
            install_script_url: self
                .install_script_url
                .clone()
                .unwrap_or(defaults.install_script_url),
            credential_env: self
                .credential_env
                .clone()
                .unwrap_or(defaults.credential_env),
            ..defaults
        }
    }

    /// The credential input, or the value already in the tool's variable.
    fn credential(&self, credential_env: &str) -> Option<String> {
        self.credential
            .clone()
            .filter(|c| !c.is_empty())
            .or_else(|| std::env::var(credential_env).ok())
            .filter(|c| !c.is_empty())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json, cli.log_level);

    let tool = cli.tool();
    let credential_env = tool.credential_env.clone();
    let options = ProvisionOptions {
        install_prefix: cli.install_prefix.clone(),
        ..Default::default()
    };

    let orchestrator = match Orchestrator::with_defaults(tool, options) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            tracing::error!(error = %e, "could not set up the HTTP client");
            return ExitCode::FAILURE;
        }
    };

    let request = RunRequest::for_host(cli.version.clone(), cli.credential(&credential_env));
    let mut ctx = RunContext::from_process_env();
    let result = orchestrator
        .run(&request, &mut ctx, |progress| {
            tracing::debug!(?progress, "{}", progress.description());
        })
        .await;

    let mut stdout = std::io::stdout().lock();
    match result {
        Ok(report) => {
            if let Err(e) = WorkflowFiles::from_env().publish(&report, &ctx, &credential_env, &mut stdout) {
                tracing::error!(error = %e, "failed to write workflow outputs");
                return ExitCode::FAILURE;
            }
            if cli.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => {
                        let _ = writeln!(stdout, "{json}");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to serialize report");
                        return ExitCode::FAILURE;
                    }
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(stage = %e.stage(), category = %e.category(), "{e}");
            let _ = writeln!(stdout, "{}", error_annotation(&e));
            eprintln!("{e}");
            eprintln!("To fix: {}", e.fix_suggestion());
            ExitCode::FAILURE
        }
    }
}
