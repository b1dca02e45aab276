//! Connection status and lifecycle events.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::identifiers::SocketId;
use crate::protocol::Event;

// ============================================================================
// ConnectionStatus
// ============================================================================

/// Observable state of a [`ConnectionManager`](super::ConnectionManager).
///
/// # Transitions
///
/// | From | Trigger | To |
/// |------|---------|----|
/// | any | socket opened | `Connected` |
/// | any | socket error | `Error` |
/// | any | socket closed, not manual | `Reconnecting` |
/// | `Reconnecting` | attempts exhausted | `Disconnected` |
/// | any | socket closed after `close()` | `Disconnected` |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No socket and no reconnect pending.
    #[default]
    Disconnected,
    /// Socket is open.
    Connected,
    /// Waiting for, or performing, a reconnect attempt.
    Reconnecting,
    /// The socket reported an error; a close usually follows.
    Error,
}

impl ConnectionStatus {
    /// Returns the lowercase wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ConnectionEvent
// ============================================================================

/// Everything observable about a manager, as a single stream.
///
/// Obtained through [`ConnectionManager::events`](super::ConnectionManager::events).
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// A socket finished its handshake.
    Opened {
        /// The socket that opened.
        socket: SocketId,
    },

    /// The live socket closed.
    Closed {
        /// The socket that closed.
        socket: SocketId,
        /// `true` when the close was requested with `close()`.
        manual: bool,
    },

    /// A reconnect attempt has been scheduled.
    Reconnecting {
        /// 1-based attempt number.
        attempt: u32,
        /// Wait before the attempt, jitter included.
        delay: Duration,
    },

    /// Reconnect attempts are exhausted; status is now `Disconnected`.
    GaveUp {
        /// Number of attempts made.
        attempts: u32,
    },

    /// A JSON frame arrived.
    Message(Event),

    /// The transport reported an error.
    TransportError(String),

    /// Status changed.
    StatusChanged(ConnectionStatus),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_disconnected() {
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&ConnectionStatus::Reconnecting).unwrap(),
            r#""reconnecting""#
        );
        let status: ConnectionStatus = serde_json::from_str(r#""error""#).unwrap();
        assert_eq!(status, ConnectionStatus::Error);
        assert_eq!(ConnectionStatus::Connected.to_string(), "connected");
    }
}
