//! Native pseudo-terminals through `portable-pty`.

use super::{
    LaunchError, LaunchRequest, ProcessExit, PtyLauncher, PtySession, SessionControl, INTERRUPT,
};
use crate::RunContext;
use portable_pty::{native_pty_system, ChildKiller, CommandBuilder, MasterPty, PtySize};
use std::io::{self, Read, Write};
use tokio::sync::{mpsc, oneshot};

/// Launches processes in the platform's native PTY (openpty on unix,
/// ConPTY on windows).
#[derive(Debug, Clone, Copy, Default)]
pub struct NativePtyLauncher;

struct NativeControl {
    writer: Box<dyn Write + Send>,
    killer: Box<dyn ChildKiller + Send + Sync>,
    // Dropping the master closes the terminal, so it lives as long as the
    // session does.
    _master: Box<dyn MasterPty + Send>,
}

impl SessionControl for NativeControl {
    fn interrupt(&mut self) -> io::Result<()> {
        self.writer.write_all(&[INTERRUPT])?;
        self.writer.flush()
    }

    fn kill(&mut self) -> io::Result<()> {
        self.killer.kill()
    }
}

impl PtyLauncher for NativePtyLauncher {
    fn launch(&self, request: &LaunchRequest, ctx: &RunContext) -> Result<PtySession, LaunchError> {
        let program = request.program.display().to_string();
        let launch_err = |message: String| LaunchError {
            program: program.clone(),
            message,
        };

        let pair = native_pty_system()
            .openpty(PtySize {
                rows: request.rows,
                cols: request.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| launch_err(format!("openpty: {e}")))?;

        // CommandBuilder starts from the current process environment.
        let mut cmd = CommandBuilder::new(&request.program);
        cmd.args(&request.args);
        for (key, value) in ctx.command_env() {
            cmd.env(key, value);
        }
        if let Ok(cwd) = std::env::current_dir() {
            cmd.cwd(cwd);
        }

        let mut child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| launch_err(format!("spawn: {e}")))?;
        // Our copy of the slave must go, or reads never see EOF.
        drop(pair.slave);

        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| launch_err(format!("reader: {e}")))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| launch_err(format!("writer: {e}")))?;
        let killer = child.clone_killer();

        let (output_tx, output_rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if output_tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let (exit_tx, exit_rx) = oneshot::channel();
        std::thread::spawn(move || {
            let code = match child.wait() {
                Ok(status) => Some(status.exit_code()),
                Err(e) => {
                    tracing::warn!(error = %e, "waiting for pty child failed");
                    None
                }
            };
            let _ = exit_tx.send(ProcessExit { code });
        });

        tracing::debug!(program = %program, cols = request.cols, rows = request.rows, "spawned in pty");
        Ok(PtySession {
            output: output_rx,
            exit: exit_rx,
            control: Box::new(NativeControl {
                writer,
                killer,
                _master: pair.master,
            }),
        })
    }
}
