//! Error types for overlay-link.
//!
//! Network conditions never surface through this type: a dropped socket or a
//! malformed frame is reported through status changes and
//! [`ConnectionEvent`](crate::client::ConnectionEvent)s. [`enum@Error`] covers
//! configuration and construction problems, plus the transport's own
//! failures before they are turned into events.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidUrl`] |
//! | Protocol | [`Error::InvalidCommand`] |
//! | External | [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when connection options are inconsistent.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Origin or WebSocket URL could not be built.
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl {
        /// The offending URL text.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Command is missing its `type` discriminant or is not a JSON object.
    #[error("Invalid command: {message}")]
    InvalidCommand {
        /// Description of the problem.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket handshake or I/O error.
    ///
    /// Raised inside the socket task and reported through
    /// [`ConnectionEvent::TransportError`](crate::client::ConnectionEvent::TransportError).
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid URL error.
    #[inline]
    pub fn invalid_url(url: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Creates an invalid command error.
    #[inline]
    pub fn invalid_command(message: impl Into<String>) -> Self {
        Self::InvalidCommand {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error comes from bad configuration.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::InvalidUrl { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_command("missing `type`");
        assert_eq!(err.to_string(), "Invalid command: missing `type`");
    }

    #[test]
    fn test_invalid_url_display() {
        let err = Error::invalid_url("nope", "relative URL without a base");
        assert_eq!(
            err.to_string(),
            "Invalid URL 'nope': relative URL without a base"
        );
    }

    #[test]
    fn test_from_websocket_error() {
        let err: Error = WsError::ConnectionClosed.into();
        assert!(matches!(err, Error::WebSocket(_)));
        assert!(err.to_string().starts_with("WebSocket error: "));
        assert!(!err.is_config_error());
    }

    #[test]
    fn test_is_config_error() {
        assert!(Error::config("x").is_config_error());
        assert!(Error::invalid_url("a", "b").is_config_error());
        assert!(!Error::invalid_command("x").is_config_error());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
