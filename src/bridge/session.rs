//! Per-connection process supervisor.
//!
//! A [`Session`] reacts to the four connection events:
//!
//! - [`Session::on_open`] resolves an interpreter, launches the script and
//!   starts forwarding its output
//! - [`Session::on_message`] writes client bytes to the child's input, with
//!   carriage returns turned into linefeeds
//! - [`Session::on_close`] kills the child, if any
//! - [`Session::on_error`] only logs
//!
//! Behind the scenes three tasks run per live child: one forwarder for each
//! output stream and a supervisor that waits for the child to exit (or for a
//! kill request), drains the forwarders and closes the connection.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::{diagnostics, Bridge, ConnectionHandle, ConnectionId, SessionState};
use crate::error::BridgeError;
use crate::process::{ChildIo, ChildProcess};
use crate::text::{normalize_input, to_crlf, Utf8Decoder};
use crate::Result;

/// What the session keeps of a live child.
struct ProcessHandle {
    pid: Option<u32>,
    input: mpsc::Sender<Vec<u8>>,
    kill: oneshot::Sender<()>,
}

#[derive(Default)]
struct Slot {
    state: SessionState,
    opened: bool,
    process: Option<ProcessHandle>,
}

impl Slot {
    fn terminate(&mut self) -> Option<ProcessHandle> {
        self.state.terminate();
        self.process.take()
    }
}

// The slot is only touched in short, non-async sections; a panic elsewhere
// must not wedge teardown.
fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One connection's process lifecycle.
pub struct Session {
    id: ConnectionId,
    conn: ConnectionHandle,
    bridge: Arc<Bridge>,
    slot: Arc<Mutex<Slot>>,
}

impl Session {
    pub(crate) fn new(bridge: Arc<Bridge>, conn: ConnectionHandle) -> Self {
        Self {
            id: conn.id(),
            conn,
            bridge,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        lock(&self.slot).state
    }

    /// Whether a live child is attached.
    pub fn has_process(&self) -> bool {
        lock(&self.slot).process.is_some()
    }

    pub fn pid(&self) -> Option<u32> {
        lock(&self.slot).process.as_ref().and_then(|p| p.pid)
    }

    /// Handle a newly opened connection.
    ///
    /// Failures are reported to the client as text and the connection is
    /// closed; the error is also returned for logging. A session can only be
    /// opened once.
    pub async fn on_open(&self) -> Result<()> {
        {
            let mut slot = lock(&self.slot);
            if slot.opened || slot.state != SessionState::Idle {
                return Err(BridgeError::InvalidStateTransition {
                    from: slot.state,
                    to: SessionState::Spawning,
                });
            }
            slot.opened = true;
        }

        // Probing runs child processes synchronously; keep it off the runtime
        let hints = self.bridge.hints();
        let locator = self.bridge.locator_arc();
        let resolved = tokio::task::spawn_blocking(move || locator.locate(&hints))
            .await
            .map_err(|e| BridgeError::Task(e.to_string()))
            .and_then(|found| found);

        let interpreter = match resolved {
            Ok(interpreter) => interpreter,
            Err(err) => {
                warn!(conn = %self.id, "interpreter resolution failed: {}", err);
                let message = match &err {
                    BridgeError::InterpreterNotFound { tried } => {
                        diagnostics::interpreter_not_found(tried)
                    }
                    other => to_crlf(&format!("{}\n", other)),
                };
                self.fail(message);
                return Err(err);
            }
        };

        {
            let mut slot = lock(&self.slot);
            if slot.state.is_terminal() {
                debug!(conn = %self.id, "closed during interpreter resolution");
                return Err(BridgeError::SessionTerminated);
            }
            slot.state.transition_to(SessionState::Spawning)?;
        }

        let spec = self.bridge.target().spawn_spec(&interpreter);
        info!(conn = %self.id, command = %spec.display(), "spawning process");

        match self.bridge.launcher().launch(&spec) {
            Ok(io) => self.attach(io),
            Err(err) => {
                warn!(conn = %self.id, "failed to start process: {}", err);
                let reason = match &err {
                    BridgeError::Spawn(reason) | BridgeError::Pty(reason) => reason.clone(),
                    other => other.to_string(),
                };
                self.fail(diagnostics::spawn_failed(&reason));
                Err(err)
            }
        }
    }

    /// Handle bytes from the client.
    ///
    /// Dropped silently when no process is running or its input is gone.
    pub async fn on_message(&self, bytes: &[u8]) {
        let input = {
            let slot = lock(&self.slot);
            if slot.state.accepts_input() {
                slot.process.as_ref().map(|p| p.input.clone())
            } else {
                None
            }
        };

        let Some(input) = input else {
            trace!(conn = %self.id, "no process, dropping {} bytes", bytes.len());
            return;
        };

        if input.send(normalize_input(bytes)).await.is_err() {
            debug!(conn = %self.id, "process input closed, message dropped");
        }
    }

    /// Handle the connection going away. Idempotent.
    pub fn on_close(&self) {
        let handle = lock(&self.slot).terminate();
        if let Some(handle) = handle {
            // The supervisor kills and reaps the child
            let _ = handle.kill.send(());
            info!(conn = %self.id, pid = ?handle.pid, "process killed and terminal unloaded");
        }
        self.conn.close();
    }

    /// Handle a transport error. Teardown happens through the other paths.
    pub fn on_error(&self, err: impl fmt::Display) {
        warn!(conn = %self.id, "connection error: {}", err);
    }

    fn fail(&self, message: String) {
        lock(&self.slot).terminate();
        self.conn.send_text(message);
        self.conn.close();
    }

    fn attach(&self, io: ChildIo) -> Result<()> {
        let ChildIo {
            input,
            stdout,
            stderr,
            mut child,
        } = io;
        let pid = child.id();
        let (kill_tx, kill_rx) = oneshot::channel();

        let rejected = {
            let mut slot = lock(&self.slot);
            if slot.state.is_terminal() {
                Some(BridgeError::SessionTerminated)
            } else if slot.process.is_some() {
                Some(BridgeError::ProcessAlreadyAttached)
            } else {
                match slot.state.transition_to(SessionState::Running) {
                    Ok(()) => {
                        slot.process = Some(ProcessHandle {
                            pid,
                            input,
                            kill: kill_tx,
                        });
                        None
                    }
                    Err(e) => Some(e),
                }
            }
        };

        if let Some(err) = rejected {
            debug!(conn = %self.id, pid = ?pid, "discarding process: {}", err);
            if let Err(e) = child.start_kill() {
                debug!(conn = %self.id, "kill failed: {}", e);
            }
            tokio::spawn(async move {
                let _ = child.wait().await;
            });
            return Err(err);
        }

        info!(conn = %self.id, pid = ?pid, "process started");

        let mut forwarders = vec![tokio::spawn(forward_output(
            stdout,
            self.conn.clone(),
            "stdout",
        ))];
        if let Some(stderr) = stderr {
            forwarders.push(tokio::spawn(forward_output(
                stderr,
                self.conn.clone(),
                "stderr",
            )));
        }

        tokio::spawn(supervise(
            child,
            kill_rx,
            forwarders,
            Arc::clone(&self.slot),
            self.conn.clone(),
        ));

        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.on_close();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("pid", &self.pid())
            .finish()
    }
}

/// Decode one output stream and send it to the client as it arrives.
async fn forward_output(
    mut rx: mpsc::Receiver<Vec<u8>>,
    conn: ConnectionHandle,
    stream: &'static str,
) {
    let mut decoder = Utf8Decoder::new();

    // Keep draining after the client leaves so the producer never stalls
    while let Some(chunk) = rx.recv().await {
        let text = decoder.decode(&chunk);
        if !text.is_empty() && !conn.send_text(text) {
            trace!(conn = %conn.id(), stream, "connection closed, discarding output");
        }
    }

    let tail = decoder.finish();
    if !tail.is_empty() {
        conn.send_text(tail);
    }
    debug!(conn = %conn.id(), stream, "output stream finished");
}

/// Wait for the child to exit or be killed, then tear the session down.
async fn supervise(
    mut child: Box<dyn ChildProcess>,
    kill_rx: oneshot::Receiver<()>,
    forwarders: Vec<JoinHandle<()>>,
    slot: Arc<Mutex<Slot>>,
    conn: ConnectionHandle,
) {
    let id = conn.id();

    // A dropped kill sender means the session is gone: kill as well
    let exit = tokio::select! {
        status = child.wait() => status,
        _ = kill_rx => {
            if let Err(e) = child.start_kill() {
                debug!(conn = %id, "kill failed: {}", e);
            }
            child.wait().await
        }
    };

    match &exit {
        Ok(status) => info!(conn = %id, %status, "process exited"),
        Err(e) => warn!(conn = %id, "failed to wait for process: {}", e),
    }

    lock(&slot).terminate();
    // Releases a PTY master so its reader sees end of stream
    drop(child);

    // Output may still be in flight after the exit notification
    for forwarder in forwarders {
        if let Err(e) = forwarder.await {
            warn!(conn = %id, "output forwarder failed: {}", e);
        }
    }

    if conn.close() {
        debug!(conn = %id, "connection closed after process exit");
    }
}
