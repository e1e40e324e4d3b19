//! Scriptable launcher for tests.
//!
//! [`MockLauncher`] hands out in-memory children. The test side of each
//! child ([`MockChild`]) can emit output, read what the session wrote to the
//! child's input, simulate an exit and count kill requests.
//!
//! # Example
//!
//! ```
//! use webterm_bridge::process::{Launcher, MockLauncher, SpawnSpec};
//!
//! # tokio_test::block_on(async {
//! let launcher = MockLauncher::new();
//! let mut io = launcher.launch(&SpawnSpec::new("python3")).unwrap();
//! let child = launcher.take_child().unwrap();
//!
//! child.emit_stdout(b"ready\n").await;
//! assert_eq!(io.stdout.recv().await.unwrap(), b"ready\n");
//! # });
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, watch};

use super::{
    ChildIo, ChildProcess, Launcher, ProcessExit, SpawnSpec, INPUT_CHANNEL_CAPACITY,
    OUTPUT_CHANNEL_CAPACITY,
};
use crate::error::BridgeError;
use crate::Result;

/// Exit reported for a killed mock child.
const KILLED: ProcessExit = ProcessExit {
    code: None,
    signal: Some(9),
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct ChildShared {
    stdout: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    stderr: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    exit: watch::Sender<Option<ProcessExit>>,
    kills: AtomicUsize,
}

impl ChildShared {
    /// Close the output streams and publish the exit, once.
    fn finish(&self, exit: ProcessExit) {
        lock(&self.stdout).take();
        lock(&self.stderr).take();
        self.exit.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(exit);
            true
        });
    }
}

struct MockProcess {
    pid: u32,
    shared: Arc<ChildShared>,
    exit_rx: watch::Receiver<Option<ProcessExit>>,
}

impl ChildProcess for MockProcess {
    fn id(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn start_kill(&mut self) -> std::io::Result<()> {
        self.shared.kills.fetch_add(1, Ordering::SeqCst);
        self.shared.finish(KILLED);
        Ok(())
    }

    fn wait(&mut self) -> BoxFuture<'_, std::io::Result<ProcessExit>> {
        Box::pin(async move {
            loop {
                let current = *self.exit_rx.borrow_and_update();
                if let Some(exit) = current {
                    return Ok(exit);
                }
                if self.exit_rx.changed().await.is_err() {
                    return Err(std::io::Error::other("mock child dropped"));
                }
            }
        })
    }
}

/// Test-side controls of a launched mock child.
pub struct MockChild {
    spec: SpawnSpec,
    shared: Arc<ChildShared>,
    input: mpsc::Receiver<Vec<u8>>,
}

impl MockChild {
    /// The request this child was launched with.
    pub fn spec(&self) -> &SpawnSpec {
        &self.spec
    }

    /// Write to the child's stdout. Returns false once it has exited.
    pub async fn emit_stdout(&self, bytes: &[u8]) -> bool {
        let tx = lock(&self.shared.stdout).clone();
        match tx {
            Some(tx) => tx.send(bytes.to_vec()).await.is_ok(),
            None => false,
        }
    }

    /// Write to the child's stderr. Returns false once it has exited, or
    /// when stderr is merged into stdout.
    pub async fn emit_stderr(&self, bytes: &[u8]) -> bool {
        let tx = lock(&self.shared.stderr).clone();
        match tx {
            Some(tx) => tx.send(bytes.to_vec()).await.is_ok(),
            None => false,
        }
    }

    /// Next chunk written to the child's input.
    pub async fn next_input(&mut self) -> Option<Vec<u8>> {
        self.input.recv().await
    }

    /// Next chunk written to the child's input, if one is already queued.
    pub fn try_next_input(&mut self) -> Option<Vec<u8>> {
        self.input.try_recv().ok()
    }

    /// Simulate the process exiting on its own.
    pub fn exit(&self, code: i32) {
        self.shared.finish(ProcessExit::code(code));
    }

    /// How many times termination was requested.
    pub fn kill_count(&self) -> usize {
        self.shared.kills.load(Ordering::SeqCst)
    }

    pub fn has_exited(&self) -> bool {
        self.shared.exit.borrow().is_some()
    }
}

struct LauncherState {
    failure: Option<String>,
    separate_stderr: bool,
    launches: usize,
    next_pid: u32,
    children: VecDeque<MockChild>,
}

/// Launcher that creates in-memory children.
#[derive(Clone)]
pub struct MockLauncher {
    state: Arc<Mutex<LauncherState>>,
}

impl MockLauncher {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LauncherState {
                failure: None,
                separate_stderr: true,
                launches: 0,
                next_pid: 4000,
                children: VecDeque::new(),
            })),
        }
    }

    /// Every launch fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        let launcher = Self::new();
        lock(&launcher.state).failure = Some(reason.into());
        launcher
    }

    /// Merge stderr into stdout, as a PTY does.
    pub fn merged_output(self) -> Self {
        lock(&self.state).separate_stderr = false;
        self
    }

    /// Number of launch attempts, failed ones included.
    pub fn launch_count(&self) -> usize {
        lock(&self.state).launches
    }

    /// Take the controls of the oldest launched child.
    pub fn take_child(&self) -> Option<MockChild> {
        lock(&self.state).children.pop_front()
    }
}

impl Default for MockLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl Launcher for MockLauncher {
    fn launch(&self, spec: &SpawnSpec) -> Result<ChildIo> {
        let mut state = lock(&self.state);
        state.launches += 1;

        if let Some(reason) = &state.failure {
            return Err(BridgeError::Spawn(reason.clone()));
        }

        let (input_tx, input_rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
        let (stdout_tx, stdout_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let (stderr_tx, stderr_rx) = if state.separate_stderr {
            let (tx, rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };
        let (exit_tx, exit_rx) = watch::channel(None);

        let shared = Arc::new(ChildShared {
            stdout: Mutex::new(Some(stdout_tx)),
            stderr: Mutex::new(stderr_tx),
            exit: exit_tx,
            kills: AtomicUsize::new(0),
        });

        let pid = state.next_pid;
        state.next_pid += 1;

        state.children.push_back(MockChild {
            spec: spec.clone(),
            shared: Arc::clone(&shared),
            input: input_rx,
        });

        Ok(ChildIo {
            input: input_tx,
            stdout: stdout_rx,
            stderr: stderr_rx,
            child: Box::new(MockProcess {
                pid,
                shared,
                exit_rx,
            }),
        })
    }
}
