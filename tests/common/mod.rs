//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use cli_provisioner::session::{
    LaunchError, LaunchRequest, ProcessExit, PtyLauncher, PtySession, SessionControl,
};
use cli_provisioner::{
    CommandOutput, DownloadError, Downloader, InstallStrategy, NodeRuntime, Orchestrator, PackageManagerInstall,
    ProcessRunner, ProvisionOptions, RunContext, RunError, ScriptInstall, StructuredCommand,
    ToolSpec, VerificationEngine,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

pub const RESOLVED_PATH: &str = "/resolved/path";

/// A machine with node 22 and npm 10 where installers succeed or fail as
/// configured. The tool becomes locatable once an installer succeeds.
pub struct FakeRunner {
    pub npm_install: CommandOutput,
    pub script_install: CommandOutput,
    pub binary_version: String,
    installed: Mutex<bool>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn new(npm_install: CommandOutput, script_install: CommandOutput, version: &str) -> Self {
        Self {
            npm_install,
            script_install,
            binary_version: version.to_string(),
            installed: Mutex::new(false),
            calls: Mutex::new(vec![]),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn install_result(&self, output: &CommandOutput) -> Result<CommandOutput, RunError> {
        if output.success() {
            *self.installed.lock().unwrap() = true;
        }
        Ok(output.clone())
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    fn locate(&self, name: &str, _ctx: &RunContext) -> Option<PathBuf> {
        match name {
            "node" | "npm" | "bash" => Some(PathBuf::from(format!("/usr/bin/{name}"))),
            "copilot" if *self.installed.lock().unwrap() => Some(PathBuf::from(RESOLVED_PATH)),
            _ => None,
        }
    }

    async fn run(
        &self,
        command: &StructuredCommand,
        _ctx: &RunContext,
        _timeout: Duration,
    ) -> Result<CommandOutput, RunError> {
        self.calls.lock().unwrap().push(command.display());
        let first = command.args.first().map(String::as_str);
        match (command.program.as_str(), first) {
            ("node", Some("--version")) => Ok(CommandOutput::ok("v22.11.0\n")),
            ("npm", Some("--version")) => Ok(CommandOutput::ok("10.2.4\n")),
            ("npm", Some("install")) => self.install_result(&self.npm_install),
            ("bash", _) => self.install_result(&self.script_install),
            (RESOLVED_PATH, Some("--version")) => Ok(CommandOutput::ok(self.binary_version.clone())),
            (program, _) => Err(RunError::NotFound {
                program: program.to_string(),
            }),
        }
    }
}

/// Serves a trivial install script and records every URL.
#[derive(Default)]
pub struct FakeDownloader {
    pub fetched: Mutex<Vec<String>>,
}

impl FakeDownloader {
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn fetch_text(&self, url: &str) -> Result<String, DownloadError> {
        self.fetched.lock().unwrap().push(url.to_string());
        Err(DownloadError::Status {
            url: url.to_string(),
            status: 404,
        })
    }

    async fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<String, DownloadError> {
        self.fetched.lock().unwrap().push(url.to_string());
        std::fs::write(dest, "#!/bin/sh\nexit 0\n").map_err(|e| DownloadError::Write {
            path: dest.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(String::new())
    }
}

/// How a scripted terminal process behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Write the transcript and exit with the code straight away.
    ExitImmediately(u32),
    /// Write the transcript, then ignore interrupts until killed.
    IgnoreInterrupts,
}

/// Replays a fixed transcript in place of a real pseudo-terminal.
pub struct FakeLauncher {
    transcript: String,
    script: Script,
    pub launches: Mutex<Vec<LaunchRequest>>,
    pub control_log: Arc<Mutex<Vec<&'static str>>>,
}

impl FakeLauncher {
    pub fn new(transcript: &str, script: Script) -> Self {
        Self {
            transcript: transcript.to_string(),
            script,
            launches: Mutex::new(vec![]),
            control_log: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().unwrap().len()
    }
}

struct FakeControl {
    log: Arc<Mutex<Vec<&'static str>>>,
    exit: Option<oneshot::Sender<ProcessExit>>,
    output: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

impl SessionControl for FakeControl {
    fn interrupt(&mut self) -> io::Result<()> {
        self.log.lock().unwrap().push("interrupt");
        Ok(())
    }

    fn kill(&mut self) -> io::Result<()> {
        self.log.lock().unwrap().push("kill");
        self.output.take();
        if let Some(tx) = self.exit.take() {
            let _ = tx.send(ProcessExit { code: Some(137) });
        }
        Ok(())
    }
}

impl PtyLauncher for FakeLauncher {
    fn launch(&self, request: &LaunchRequest, _ctx: &RunContext) -> Result<PtySession, LaunchError> {
        self.launches.lock().unwrap().push(request.clone());
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        if !self.transcript.is_empty() {
            let _ = out_tx.send(self.transcript.as_bytes().to_vec());
        }
        let (exit_tx, exit_rx) = oneshot::channel();

        let control = match self.script {
            Script::ExitImmediately(code) => {
                let _ = exit_tx.send(ProcessExit { code: Some(code) });
                drop(out_tx);
                FakeControl {
                    log: self.control_log.clone(),
                    exit: None,
                    output: None,
                }
            }
            Script::IgnoreInterrupts => FakeControl {
                log: self.control_log.clone(),
                exit: Some(exit_tx),
                output: Some(out_tx),
            },
        };
        Ok(PtySession {
            output: out_rx,
            exit: exit_rx,
            control: Box::new(control),
        })
    }
}

/// An orchestrator over the fakes, wired the way `with_defaults` wires the
/// real implementations.
pub fn orchestrator(
    runner: Arc<FakeRunner>,
    downloader: Arc<FakeDownloader>,
    launcher: Arc<FakeLauncher>,
) -> Orchestrator {
    let tool = ToolSpec::default();
    let options = ProvisionOptions {
        install_prefix: Some(std::env::temp_dir().join("cli-provisioner-it-prefix")),
        ..Default::default()
    };
    let engine = VerificationEngine::new(runner.clone(), launcher, tool.clone(), &options);
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
    let prerequisite = Arc::new(NodeRuntime::new(runner, downloader, options));
    Orchestrator::new(prerequisite, strategies, engine, tool.credential_env)
}
