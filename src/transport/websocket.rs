//! tokio-tungstenite backed [`Connector`].
//!
//! Each opened socket is one spawned task that first performs the client
//! handshake and then runs the I/O loop:
//!
//! - Incoming frames are forwarded as [`SocketEvent::Message`]
//! - [`SocketCommand::Send`] frames are written to the socket
//! - [`SocketCommand::Close`] (or dropping the handle) closes it
//!
//! The task always ends by emitting [`SocketEvent::Close`].

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::Error;

use super::{Connector, Frame, SocketCommand, SocketEvent, SocketHandle, SocketPeer};

// ============================================================================
// WebSocketConnector
// ============================================================================

/// Opens real WebSocket connections.
///
/// Must be used from within a Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Creates a connector.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Connector for WebSocketConnector {
    fn open(&self, url: &Url) -> SocketHandle {
        let (handle, peer) = SocketHandle::pair();
        tokio::spawn(run_socket(url.clone(), peer));
        handle
    }
}

// ============================================================================
// Socket Task
// ============================================================================

/// Connects, then pumps frames until either side closes.
async fn run_socket(url: Url, peer: SocketPeer) {
    let SocketPeer {
        mut commands,
        events,
    } = peer;

    debug!(%url, "Opening WebSocket");

    let connect = connect_async(url.as_str());
    tokio::pin!(connect);

    let ws_stream = loop {
        tokio::select! {
            result = &mut connect => match result {
                Ok((stream, _response)) => break stream,
                Err(e) => {
                    let error = Error::from(e);
                    warn!(%url, %error, "WebSocket connect failed");
                    let _ = events.send(SocketEvent::Error(error.to_string()));
                    let _ = events.send(SocketEvent::Close);
                    return;
                }
            },

            command = commands.recv() => match command {
                Some(SocketCommand::Send(_)) => {
                    warn!("Dropping frame sent before socket opened");
                }
                Some(SocketCommand::Close) | None => {
                    debug!(%url, "Socket closed while connecting");
                    let _ = events.send(SocketEvent::Close);
                    return;
                }
            },
        }
    };

    if events.send(SocketEvent::Open).is_err() {
        debug!("Socket owner gone before open");
        return;
    }

    let (mut ws_write, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            // Incoming frames from server
            message = ws_read.next() => {
                let frame = match message {
                    Some(Ok(Message::Text(text))) => Frame::Text(text.to_string()),
                    Some(Ok(Message::Binary(data))) => Frame::Binary(data.to_vec()),

                    Some(Ok(Message::Close(_))) => {
                        debug!("WebSocket closed by remote");
                        break;
                    }

                    Some(Err(e)) => {
                        let error = Error::from(e);
                        warn!(%error, "WebSocket read failed");
                        let _ = events.send(SocketEvent::Error(error.to_string()));
                        break;
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }

                    // Ping/Pong are answered by tungstenite
                    Some(Ok(_)) => continue,
                };

                if events.send(SocketEvent::Message(frame)).is_err() {
                    debug!("Socket owner gone, closing");
                    let _ = ws_write.close().await;
                    return;
                }
            }

            // Commands from the manager
            command = commands.recv() => match command {
                Some(SocketCommand::Send(text)) => {
                    if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                        let error = Error::from(e);
                        warn!(%error, "Failed to send frame");
                        let _ = events.send(SocketEvent::Error(error.to_string()));
                        break;
                    }
                    trace!("Frame sent");
                }

                Some(SocketCommand::Close) | None => {
                    debug!("Close requested");
                    let _ = ws_write.close().await;
                    break;
                }
            },
        }
    }

    let _ = events.send(SocketEvent::Close);
    debug!(%url, "Socket task terminated");
}

// ============================================================================
// Tests
// ============================================================================
