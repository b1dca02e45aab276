//! Connection management.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `manager` | [`ConnectionManager`] state machine |
//! | `builder` | [`ConnectionManagerBuilder`] fluent construction |
//! | `options` | [`ConnectionOptions`] and callback types |
//! | `backoff` | [`ReconnectPolicy`] |
//! | `queue` | [`CommandQueue`] for commands issued while offline |
//! | `status` | [`ConnectionStatus`] and [`ConnectionEvent`] |

// ============================================================================
// Submodules
// ============================================================================

/// Reconnect back-off policy.
pub mod backoff;

/// Manager builder.
pub mod builder;

/// Connection manager.
pub mod manager;

/// Options and callbacks.
pub mod options;

/// Pending command buffer.
pub mod queue;

/// Status and lifecycle events.
pub mod status;

// ============================================================================
// Re-exports
// ============================================================================

pub use backoff::ReconnectPolicy;
pub use builder::ConnectionManagerBuilder;
pub use manager::{ConnectionManager, Delivery};
pub use options::{ConnectionOptions, ErrorHandler, EventHandler, StatusHandler};
pub use queue::CommandQueue;
pub use status::{ConnectionEvent, ConnectionStatus};
