//! Child process abstraction.
//!
//! A [`Launcher`] turns a [`SpawnSpec`] into a running child whose standard
//! streams are exposed as byte channels. Two strategies exist:
//!
//! - [`PipeLauncher`]: redirected stdin/stdout/stderr pipes via `tokio::process`
//! - [`PtyLauncher`]: a fixed-size pseudo-terminal via `portable-pty`
//!
//! [`MockLauncher`] stands in for both in tests.
//!
//! Callers never see which one is in use.

mod blocking;
mod mock;
mod pipe;
mod pty;

pub use blocking::{BlockingReader, BlockingWriter};
pub use mock::{MockChild, MockLauncher};
pub use pipe::{pump_reader, pump_writer, PipeLauncher};
pub use pty::PtyLauncher;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::Result;

/// Capacity of the per-stream output channels.
pub(crate) const OUTPUT_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the input channel.
pub(crate) const INPUT_CHANNEL_CAPACITY: usize = 64;

/// Read buffer size for output pumps.
pub(crate) const READ_BUFFER_SIZE: usize = 4096;

/// What to run and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Variables set on top of the inherited environment.
    pub env: BTreeMap<String, String>,
}

impl SpawnSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: PathBuf::from("."),
            env: BTreeMap::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = dir.into();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Command line for logging.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessExit {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Terminating signal on Unix.
    pub signal: Option<i32>,
}

impl ProcessExit {
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ProcessExit {
    fn from(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {}", code),
            (None, Some(signal)) => write!(f, "signal {}", signal),
            (None, None) => write!(f, "unknown status"),
        }
    }
}

/// Lifecycle control of a spawned child.
pub trait ChildProcess: Send {
    /// OS process id, if still known.
    fn id(&self) -> Option<u32>;

    /// Request immediate termination without waiting for it.
    fn start_kill(&mut self) -> std::io::Result<()>;

    /// Wait for the child to exit.
    fn wait(&mut self) -> BoxFuture<'_, std::io::Result<ProcessExit>>;
}

/// A running child and its stream endpoints.
pub struct ChildIo {
    /// Bytes sent here are written to the child's input.
    pub input: mpsc::Sender<Vec<u8>>,
    /// Chunks read from standard output (or the PTY).
    pub stdout: mpsc::Receiver<Vec<u8>>,
    /// Chunks read from standard error; `None` when merged into `stdout`.
    pub stderr: Option<mpsc::Receiver<Vec<u8>>>,
    pub child: Box<dyn ChildProcess>,
}

impl fmt::Debug for ChildIo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildIo")
            .field("pid", &self.child.id())
            .field("separate_stderr", &self.stderr.is_some())
            .finish()
    }
}

/// Acquires bidirectional byte-stream-backed child processes.
///
/// Must be called from within a tokio runtime.
pub trait Launcher: Send + Sync {
    fn launch(&self, spec: &SpawnSpec) -> Result<ChildIo>;
}

/// Process spawning strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpawnMode {
    /// Redirected standard streams.
    #[default]
    Pipe,
    /// Native pseudo-terminal.
    Pty,
}

impl SpawnMode {
    /// The launcher implementing this strategy.
    pub fn launcher(self) -> Arc<dyn Launcher> {
        match self {
            SpawnMode::Pipe => Arc::new(PipeLauncher::new()),
            SpawnMode::Pty => Arc::new(PtyLauncher::new()),
        }
    }
}

impl FromStr for SpawnMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pipe" | "pipes" => Ok(SpawnMode::Pipe),
            "pty" => Ok(SpawnMode::Pty),
            other => Err(format!("unknown spawn mode: {}", other)),
        }
    }
}

impl fmt::Display for SpawnMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnMode::Pipe => f.write_str("pipe"),
            SpawnMode::Pty => f.write_str("pty"),
        }
    }
}
