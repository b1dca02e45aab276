//! Type-safe identifiers.
//!
//! Every socket a manager opens gets a fresh [`SocketId`]. Socket events are
//! tagged with it so that late events from a replaced socket can be told
//! apart from events of the live one.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// SocketId
// ============================================================================

/// Identifier of one underlying socket instance.
///
/// Monotonically increasing across the whole process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketId(u64);

/// Next id handed out by [`SocketId::next`].
static NEXT_SOCKET_ID: AtomicU64 = AtomicU64::new(1);

impl SocketId {
    /// Allocates a new, never before used id.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SOCKET_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_ids_are_unique_and_increasing() {
        let a = SocketId::next();
        let b = SocketId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_display() {
        let id = SocketId(7);
        assert_eq!(id.to_string(), "socket-7");
    }
}
