//! Socket transport layer.
//!
//! The manager never talks to a WebSocket library directly. It asks a
//! [`Connector`] for a socket and drives it through a [`SocketHandle`]: a
//! pair of channels modelled on the browser socket API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   SocketCommand    ┌──────────────────────┐
//! │  ConnectionManager   │ ─────────────────► │  Connector task      │
//! │                      │                    │  (tokio-tungstenite) │
//! │  pump task per socket│ ◄───────────────── │                      │
//! └──────────────────────┘    SocketEvent     └──────────────────────┘
//! ```
//!
//! # Socket Lifecycle
//!
//! 1. `Connector::open` returns a handle at once, socket is CONNECTING
//! 2. `SocketEvent::Open` once the handshake completes
//! 3. Any number of `SocketEvent::Message` / `SocketEvent::Error`
//! 4. Exactly one final `SocketEvent::Close`, after which the channel ends
//!
//! A socket that fails to connect reports `Error` followed by `Close`.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;
use url::Url;

// ============================================================================
// Submodules
// ============================================================================

/// tokio-tungstenite backed connector.
pub mod websocket;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use websocket::WebSocketConnector;

// ============================================================================
// Messages
// ============================================================================

/// Instruction from the manager to a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketCommand {
    /// Send a text frame.
    Send(String),
    /// Close the socket. A `Close` event follows.
    Close,
}

/// A data frame received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
}

/// Notification from a socket to the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// Handshake completed; the socket is OPEN.
    Open,
    /// Frame received.
    Message(Frame),
    /// Transport error. Does not by itself end the socket.
    Error(String),
    /// The socket is closed. Always the last event.
    Close,
}

// ============================================================================
// SocketHandle
// ============================================================================

/// Manager-side end of a socket.
#[derive(Debug)]
pub struct SocketHandle {
    commands: mpsc::UnboundedSender<SocketCommand>,
    events: mpsc::UnboundedReceiver<SocketEvent>,
}

/// Connector-side end of a socket.
#[derive(Debug)]
pub struct SocketPeer {
    /// Instructions from the manager.
    pub commands: mpsc::UnboundedReceiver<SocketCommand>,
    /// Events towards the manager.
    pub events: mpsc::UnboundedSender<SocketEvent>,
}

impl SocketHandle {
    /// Creates a connected handle/peer pair.
    #[must_use]
    pub fn pair() -> (Self, SocketPeer) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let handle = Self {
            commands: command_tx,
            events: event_rx,
        };
        let peer = SocketPeer {
            commands: command_rx,
            events: event_tx,
        };

        (handle, peer)
    }

    /// Splits into the command sender and the event receiver.
    #[inline]
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        mpsc::UnboundedSender<SocketCommand>,
        mpsc::UnboundedReceiver<SocketEvent>,
    ) {
        (self.commands, self.events)
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Socket factory.
///
/// Implementations must return immediately and report progress through the
/// handle's events; they may spawn tasks on the current Tokio runtime.
pub trait Connector: Send + Sync + 'static {
    /// Starts connecting to `url`.
    fn open(&self, url: &Url) -> SocketHandle;
}

impl<F> Connector for F
where
    F: Fn(&Url) -> SocketHandle + Send + Sync + 'static,
{
    fn open(&self, url: &Url) -> SocketHandle {
        self(url)
    }
}
