//! Error types for webterm-bridge.

use thiserror::Error;

use crate::bridge::SessionState;

/// Main error type for bridge operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// No interpreter candidate could be launched.
    #[error("interpreter not found (tried: {})", tried.join(", "))]
    InterpreterNotFound {
        /// Every candidate string attempted, in attempt order.
        tried: Vec<String>,
    },

    /// The child process could not be started.
    #[error("spawn failed: {0}")]
    Spawn(String),

    /// PTY-related error.
    #[error("PTY error: {0}")]
    Pty(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid state transition attempted.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition { from: SessionState, to: SessionState },

    /// A second process was attached to a session.
    #[error("session already has a running process")]
    ProcessAlreadyAttached,

    /// Session has been terminated.
    #[error("session terminated")]
    SessionTerminated,

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,

    /// Blocking task failed to complete.
    #[error("background task failed: {0}")]
    Task(String),
}

/// Convenience Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
