//! Session state machine.

/// Lifecycle state of a bridge session.
///
/// ```text
/// Idle ──► Spawning ──► Running ──► Terminated
///   │          │                        ▲
///   └──────────┴────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Connection open, interpreter not yet resolved.
    #[default]
    Idle,
    /// Interpreter found, child process being launched.
    Spawning,
    /// Child attached and I/O being forwarded.
    Running,
    /// Session over; no process will ever be attached again.
    Terminated,
}

impl SessionState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Idle -> Spawning
    /// - Idle -> Terminated (interpreter not found, early close)
    /// - Spawning -> Running
    /// - Spawning -> Terminated (spawn failure)
    /// - Running -> Terminated
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (*self, target),
            (Idle, Spawning)
                | (Idle, Terminated)
                | (Spawning, Running)
                | (Spawning, Terminated)
                | (Running, Terminated)
        )
    }

    /// Attempt to transition to a new state.
    pub fn transition_to(&mut self, target: SessionState) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::BridgeError::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Force `Terminated` from any state (teardown paths).
    pub fn terminate(&mut self) {
        *self = SessionState::Terminated;
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Terminated)
    }

    /// Whether input can reach a process in this state.
    pub fn accepts_input(&self) -> bool {
        matches!(self, SessionState::Running)
    }
}
