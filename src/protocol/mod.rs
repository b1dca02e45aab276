//! Wire message types.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `PendingCommand` | Client → Server | Subscription and control commands |
//! | `Event` | Server → Client | Panel data pushed by the server |
//!
//! Both directions use JSON text frames keyed by a `type` field.

// ============================================================================
// Submodules
// ============================================================================

/// Outbound command definitions.
pub mod command;

/// Inbound event types.
pub mod event;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Command, PendingCommand};
pub use event::{Event, ParsedEvent};
