//! Outbound side of a connection.
//!
//! The session never touches the socket directly. It pushes [`Outbound`]
//! items into a channel that the transport drains; the handle guarantees that
//! at most one close is ever issued per connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use super::ConnectionId;

/// Something the transport must do on the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Send text (process output or a diagnostic).
    Text(String),
    /// Close the connection.
    Close,
}

/// Cloneable send/close handle for one connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Outbound>,
    closed: Arc<AtomicBool>,
}

impl ConnectionHandle {
    /// Create a handle and the receiver the transport drains.
    pub fn new(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id,
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        };
        (handle, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue text for the client.
    ///
    /// Returns false once the connection is closed.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        if self.is_closed() {
            return false;
        }
        self.tx.send(Outbound::Text(text.into())).is_ok()
    }

    /// Close the connection.
    ///
    /// Only the first call queues a close; it returns true, later calls
    /// return false.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        let _ = self.tx.send(Outbound::Close);
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
