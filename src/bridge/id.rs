//! Connection identifier type.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for connection ID generation.
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifier for one WebSocket connection and its session.
///
/// Generated from an atomic counter, so unique within a single process
/// lifetime. Displayed as `conn-XXXXXXXX` (hexadecimal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Create a new unique connection ID.
    pub fn new() -> Self {
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a ConnectionId from a raw value (tests, log correlation).
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{:08x}", self.0)
    }
}
