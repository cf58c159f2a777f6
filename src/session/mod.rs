//! Interactive sessions inside a pseudo-terminal.
//!
//! Many interactive CLIs only print their startup banner (and only attempt
//! authentication) when attached to a terminal, so verification drives the
//! tool through a real PTY. [`drive`] runs the session as an explicit state
//! machine:
//!
//! ```text
//! Collecting --graceful timer--> Interrupted(1) --+250ms--> Interrupted(2)
//!      |                              |                         |
//!      +------------------------------+----hard timer--> Killed |
//!      |                              |                  |      |
//!      +------------- process exit ---+------------------+------+--> Exited
//! ```
//!
//! Output collection, the graceful-stop timer, the hard-stop timer and
//! process exit race in one `select!` loop. Timers are plain deadlines owned
//! by the loop, so leaving the loop on exit disarms all of them at once and
//! no signal can reach an already-reaped process. Exit and the timers are
//! polled ahead of output, so a process that never stops printing is still
//! stopped on time.

mod classify;
mod pty;

pub use classify::{classify, strip_ansi, Handshake};
pub use pty::NativePtyLauncher;

use crate::{RunContext, SessionTimings};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// ETX, what a terminal sends for Ctrl-C.
pub const INTERRUPT: u8 = 0x03;

/// How long to wait for the process to be reaped after a kill.
const REAP_GRACE: Duration = Duration::from_secs(2);

/// How long to keep reading output that was still in flight at exit.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// What to start inside the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cols: u16,
    pub rows: u16,
}

/// The process could not be started in a terminal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to start {program} in a pseudo-terminal: {message}")]
pub struct LaunchError {
    pub program: String,
    pub message: String,
}

/// Exit status reported by the terminal's child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessExit {
    /// `None` when the status could not be collected.
    pub code: Option<u32>,
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Writes to and signals the process behind a terminal.
pub trait SessionControl: Send {
    /// Write an interrupt character into the terminal.
    fn interrupt(&mut self) -> io::Result<()>;

    /// Forcibly terminate the process.
    fn kill(&mut self) -> io::Result<()>;
}

/// A running process attached to a terminal.
///
/// `output` yields raw terminal chunks and closes when the terminal does;
/// `exit` resolves once with the process status.
pub struct PtySession {
    pub output: mpsc::UnboundedReceiver<Vec<u8>>,
    pub exit: oneshot::Receiver<ProcessExit>,
    pub control: Box<dyn SessionControl>,
}

/// Starts processes in pseudo-terminals.
pub trait PtyLauncher: Send + Sync {
    fn launch(&self, request: &LaunchRequest, ctx: &RunContext) -> Result<PtySession, LaunchError>;
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ExitCause {
    /// The process exited before any stop signal was sent.
    SelfExited,
    /// The process exited after the interrupt sequence began.
    Interrupted,
    /// The hard-stop timer killed the process.
    Killed,
}

/// States of the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Collecting,
    Interrupted { sent: u8 },
    Killed,
    Exited,
}

impl SessionPhase {
    fn exit_cause(self) -> ExitCause {
        match self {
            Self::Collecting | Self::Exited => ExitCause::SelfExited,
            Self::Interrupted { .. } => ExitCause::Interrupted,
            Self::Killed => ExitCause::Killed,
        }
    }
}

/// Everything observed during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Raw terminal output, lossily decoded.
    pub transcript: String,
    /// Total bytes received.
    pub bytes: usize,
    pub exit: ProcessExit,
    pub cause: ExitCause,
    pub interrupts_sent: u8,
}

impl SessionOutcome {
    /// The process failed and never wrote anything: it most likely never
    /// started at all.
    pub fn never_started(&self) -> bool {
        !self.exit.success() && self.bytes == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerEvent {
    GracefulStop,
    SecondInterrupt,
    HardStop,
    ReapDeadline,
}

/// Deadlines armed by the state machine, all measured on the tokio clock.
#[derive(Debug, Default)]
struct Timers {
    graceful: Option<Instant>,
    second_interrupt: Option<Instant>,
    hard: Option<Instant>,
    reap: Option<Instant>,
}

impl Timers {
    fn next(&self) -> Option<(Instant, TimerEvent)> {
        [
            (self.graceful, TimerEvent::GracefulStop),
            (self.second_interrupt, TimerEvent::SecondInterrupt),
            (self.hard, TimerEvent::HardStop),
            (self.reap, TimerEvent::ReapDeadline),
        ]
        .into_iter()
        .filter_map(|(at, event)| at.map(|at| (at, event)))
        .min_by_key(|(at, _)| *at)
    }

    fn disarm_all(&mut self) {
        *self = Self::default();
    }
}

/// Run a session to completion.
///
/// Returns once the process has exited (or could not be reaped after the
/// hard stop) and in-flight output has been drained.
pub async fn drive(session: PtySession, timings: SessionTimings) -> SessionOutcome {
    let PtySession {
        mut output,
        mut exit,
        mut control,
    } = session;

    let spawned_at = Instant::now();
    let mut timers = Timers {
        graceful: Some(spawned_at + timings.graceful_stop_after),
        hard: Some(spawned_at + timings.hard_stop_after),
        ..Default::default()
    };
    let mut phase = SessionPhase::Collecting;
    let mut interrupts_sent = 0u8;
    let mut buffer: Vec<u8> = Vec::new();
    let mut output_open = true;

    let (status, cause) = loop {
        let next = timers.next();
        let deadline = next
            .map(|(at, _)| at)
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

        tokio::select! {
            biased;

            status = &mut exit => {
                let cause = phase.exit_cause();
                timers.disarm_all();
                phase = SessionPhase::Exited;
                tracing::debug!(?status, %cause, "interactive session exited");
                break (status.unwrap_or(ProcessExit { code: None }), cause);
            }

            _ = tokio::time::sleep_until(deadline), if next.is_some() => {
                let Some((_, event)) = next else { continue };
                match event {
                    TimerEvent::GracefulStop => {
                        timers.graceful = None;
                        if phase == SessionPhase::Collecting {
                            tracing::debug!("graceful stop: sending interrupt");
                            send_interrupt(control.as_mut());
                            interrupts_sent += 1;
                            phase = SessionPhase::Interrupted { sent: 1 };
                            timers.second_interrupt =
                                Some(Instant::now() + timings.second_interrupt_delay);
                        }
                    }
                    TimerEvent::SecondInterrupt => {
                        timers.second_interrupt = None;
                        if let SessionPhase::Interrupted { sent } = phase {
                            tracing::debug!("graceful stop: sending second interrupt");
                            send_interrupt(control.as_mut());
                            interrupts_sent += 1;
                            phase = SessionPhase::Interrupted { sent: sent + 1 };
                        }
                    }
                    TimerEvent::HardStop => {
                        timers.graceful = None;
                        timers.second_interrupt = None;
                        timers.hard = None;
                        tracing::warn!("hard stop: killing interactive session");
                        if let Err(e) = control.kill() {
                            tracing::warn!(error = %e, "kill failed");
                        }
                        phase = SessionPhase::Killed;
                        timers.reap = Some(Instant::now() + REAP_GRACE);
                    }
                    TimerEvent::ReapDeadline => {
                        tracing::warn!("process did not exit after kill, giving up on it");
                        timers.disarm_all();
                        phase = SessionPhase::Exited;
                        break (ProcessExit { code: None }, ExitCause::Killed);
                    }
                }
            }

            chunk = output.recv(), if output_open => match chunk {
                Some(bytes) => buffer.extend_from_slice(&bytes),
                None => output_open = false,
            },
        }
    };
    debug_assert_eq!(phase, SessionPhase::Exited);

    if output_open {
        let _ = tokio::time::timeout(DRAIN_GRACE, async {
            while let Some(bytes) = output.recv().await {
                buffer.extend_from_slice(&bytes);
            }
        })
        .await;
    }

    SessionOutcome {
        bytes: buffer.len(),
        transcript: String::from_utf8_lossy(&buffer).into_owned(),
        exit: status,
        cause,
        interrupts_sent,
    }
}

fn send_interrupt(control: &mut dyn SessionControl) {
    if let Err(e) = control.interrupt() {
        tracing::warn!(error = %e, "failed to write interrupt");
    }
}
