//! overlay-link - Self-healing WebSocket client for debug overlays.
//!
//! A debug overlay streams panel data (logs, queries, timings) from the
//! application server over one WebSocket. This crate keeps that socket
//! alive: it reconnects with jittered exponential back-off after
//! unexpected closes, and buffers commands issued while offline so that
//! UI actions are not lost.
//!
//! # Architecture
//!
//! - [`ConnectionManager`] owns the connection lifecycle and the command queue
//! - [`transport::Connector`] opens sockets; [`transport::WebSocketConnector`]
//!   is the tokio-tungstenite implementation
//! - Inbound frames are JSON, delivered as [`Event`]s
//! - Outbound frames are JSON objects with a `type` field ([`PendingCommand`])
//!
//! # Quick Start
//!
//! ```no_run
//! use overlay_link::{ConnectionManager, ConnectionOptions, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let options = ConnectionOptions::new("http://localhost:8000")
//!         .with_base_path("/_debug")
//!         .on_event(|event| println!("{:?}", event.parse()))
//!         .on_status_change(|status| println!("status: {status}"));
//!
//!     let manager = ConnectionManager::with_websocket(options)?;
//!
//!     // Queued until the socket opens
//!     manager.subscribe(["logs", "queries"]);
//!     manager.connect();
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     manager.close();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`ConnectionManager`], builder, options, back-off, status |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Command and event message types |
//! | [`transport`] | Socket abstraction and WebSocket connector |

// ============================================================================
// Modules
// ============================================================================

/// Connection management.
///
/// Use [`ConnectionManager::builder`], [`ConnectionManager::new`] or
/// [`ConnectionManager::with_websocket`].
pub mod client;

/// Error types and result aliases.
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Wire message types.
pub mod protocol;

/// Socket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{
    ConnectionEvent, ConnectionManager, ConnectionManagerBuilder, ConnectionOptions,
    ConnectionStatus, Delivery, ReconnectPolicy,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::SocketId;

// Protocol types
pub use protocol::{Command, Event, ParsedEvent, PendingCommand};
