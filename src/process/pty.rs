//! Pseudo-terminal child processes via portable-pty.
//!
//! The PTY is allocated at a fixed size and never resized; stdout and
//! stderr share the terminal, so [`ChildIo::stderr`] is `None`.

use std::time::Duration;

use futures_util::future::BoxFuture;
use portable_pty::{native_pty_system, CommandBuilder, MasterPty, PtySize};
use tokio::sync::mpsc;
use tracing::debug;

use super::{
    BlockingReader, BlockingWriter, ChildIo, ChildProcess, Launcher, ProcessExit, SpawnSpec,
    INPUT_CHANNEL_CAPACITY, OUTPUT_CHANNEL_CAPACITY,
};
use crate::error::BridgeError;
use crate::Result;

const PTY_ROWS: u16 = 24;
const PTY_COLS: u16 = 80;

/// How often a PTY child is polled for exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Launches children attached to a native PTY.
#[derive(Debug, Clone, Copy, Default)]
pub struct PtyLauncher;

impl PtyLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl Launcher for PtyLauncher {
    fn launch(&self, spec: &SpawnSpec) -> Result<ChildIo> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: PTY_ROWS,
                cols: PTY_COLS,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| BridgeError::Pty(e.to_string()))?;

        // The environment is inherited from this process
        let mut cmd = CommandBuilder::new(&spec.program);
        cmd.args(&spec.args);
        cmd.cwd(&spec.cwd);
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| BridgeError::Spawn(e.to_string()))?;
        // Only the child may hold the slave, or reads never see EOF
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| BridgeError::Pty(e.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| BridgeError::Pty(e.to_string()))?;

        let (input_tx, input_rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
        let (output_tx, output_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);

        tokio::spawn(BlockingReader::new(reader, output_tx).run());
        tokio::spawn(BlockingWriter::new(writer, input_rx).run());

        debug!(pid = ?child.process_id(), command = %spec.display(), "spawned PTY child");

        Ok(ChildIo {
            input: input_tx,
            stdout: output_rx,
            stderr: None,
            child: Box::new(PtyChild {
                child,
                _master: pair.master,
            }),
        })
    }
}

struct PtyChild {
    child: Box<dyn portable_pty::Child + Send + Sync>,
    // Dropping the master closes the terminal
    _master: Box<dyn MasterPty + Send>,
}

impl ChildProcess for PtyChild {
    fn id(&self) -> Option<u32> {
        self.child.process_id()
    }

    fn start_kill(&mut self) -> std::io::Result<()> {
        self.child.kill()
    }

    fn wait(&mut self) -> BoxFuture<'_, std::io::Result<ProcessExit>> {
        Box::pin(async move {
            loop {
                if let Some(status) = self.child.try_wait()? {
                    return Ok(ProcessExit::code(status.exit_code() as i32));
                }
                tokio::time::sleep(EXIT_POLL_INTERVAL).await;
            }
        })
    }
}
