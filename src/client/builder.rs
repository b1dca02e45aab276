//! Builder pattern for connection manager configuration.
//!
//! Provides a fluent API for configuring and creating [`ConnectionManager`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use overlay_link::ConnectionManager;
//!
//! # fn example() -> overlay_link::Result<()> {
//! let manager = ConnectionManager::builder()
//!     .origin("https://app.local")
//!     .base_path("/_debug")
//!     .reconnect_delay(Duration::from_millis(500))
//!     .on_status_change(|status| println!("status: {status}"))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::protocol::Event;
use crate::transport::{Connector, WebSocketConnector};

use super::backoff::ReconnectPolicy;
use super::manager::ConnectionManager;
use super::options::ConnectionOptions;
use super::status::ConnectionStatus;

// ============================================================================
// ConnectionManagerBuilder
// ============================================================================

/// Builder for configuring a [`ConnectionManager`] instance.
///
/// Use [`ConnectionManager::builder()`] to create a new builder.
pub struct ConnectionManagerBuilder {
    /// Page origin; required.
    origin: Option<String>,
    /// Everything else, with the origin left blank until `build`.
    options: ConnectionOptions,
    /// Socket factory; [`WebSocketConnector`] when unset.
    connector: Option<Box<dyn Connector>>,
}

impl Default for ConnectionManagerBuilder {
    fn default() -> Self {
        Self {
            origin: None,
            options: ConnectionOptions::new(String::new()),
            connector: None,
        }
    }
}

impl fmt::Debug for ConnectionManagerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManagerBuilder")
            .field("origin", &self.origin)
            .field("options", &self.options)
            .field("connector", &self.connector.is_some())
            .finish()
    }
}

// ============================================================================
// ConnectionManagerBuilder Implementation
// ============================================================================

impl ConnectionManagerBuilder {
    /// Creates a new builder with default settings and no origin.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the origin of the page hosting the overlay.
    ///
    /// # Arguments
    ///
    /// * `origin` - e.g. `"https://app.local:8443"`
    #[inline]
    #[must_use]
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Sets the endpoint path prefix; `/ws` is appended.
    #[inline]
    #[must_use]
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.options = self.options.with_base_path(base_path);
        self
    }

    /// Sets the number of reconnect attempts before giving up.
    #[inline]
    #[must_use]
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.options = self.options.with_max_reconnect_attempts(attempts);
        self
    }

    /// Sets the base reconnect delay.
    #[inline]
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.options = self.options.with_reconnect_delay(delay);
        self
    }

    /// Sets the cap on the pre-jitter reconnect delay.
    #[inline]
    #[must_use]
    pub fn max_reconnect_delay(mut self, delay: Duration) -> Self {
        self.options = self.options.with_max_reconnect_delay(delay);
        self
    }

    /// Replaces the whole reconnect policy.
    #[inline]
    #[must_use]
    pub fn reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.options = self.options.with_reconnect_policy(policy);
        self
    }

    /// Bounds the pending command queue.
    #[inline]
    #[must_use]
    pub fn queue_limit(mut self, limit: usize) -> Self {
        self.options = self.options.with_queue_limit(limit);
        self
    }

    /// Registers the inbound event callback.
    #[must_use]
    pub fn on_event<F>(mut self, handler: F) -> Self
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        self.options = self.options.on_event(handler);
        self
    }

    /// Registers the transport error callback.
    #[must_use]
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.options = self.options.on_error(handler);
        self
    }

    /// Registers the status change callback.
    #[must_use]
    pub fn on_status_change<F>(mut self, handler: F) -> Self
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        self.options = self.options.on_status_change(handler);
        self
    }

    /// Starts from existing options, origin included.
    #[must_use]
    pub fn options(mut self, options: ConnectionOptions) -> Self {
        self.origin = Some(options.origin.clone());
        self.options = options;
        self
    }

    /// Opens sockets through `connector` instead of [`WebSocketConnector`].
    #[must_use]
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Some(Box::new(connector));
        self
    }

    /// Builds the manager with validation. Does not connect.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no origin was set
    /// - Any error from [`ConnectionOptions::validate`]
    pub fn build(self) -> Result<ConnectionManager> {
        let origin = self.origin.ok_or_else(|| {
            Error::config(
                "Origin is required. Use .origin() to set it.\n\
                 Example: ConnectionManager::builder().origin(\"http://localhost:8000\")",
            )
        })?;

        let mut options = self.options;
        options.origin = origin;

        let connector = self
            .connector
            .unwrap_or_else(|| Box::new(WebSocketConnector::new()));

        ConnectionManager::from_parts(options, connector)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::mock::MockConnector;

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = ConnectionManagerBuilder::new();
        assert!(builder.origin.is_none());
        assert!(builder.connector.is_none());
        assert_eq!(builder.options.reconnect, ReconnectPolicy::default());
    }

    #[test]
    fn test_build_without_origin_fails() {
        let err = ConnectionManager::builder().build().unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains(".origin()"));
    }

    #[test]
    fn test_setters_reach_options() {
        let builder = ConnectionManager::builder()
            .origin("https://app.local")
            .base_path("dbg/")
            .max_reconnect_attempts(2)
            .reconnect_delay(Duration::from_millis(50))
            .max_reconnect_delay(Duration::from_millis(400))
            .queue_limit(4)
            .on_event(|_| {});

        assert_eq!(builder.origin.as_deref(), Some("https://app.local"));
        assert_eq!(builder.options.normalized_base_path(), "/dbg");
        assert_eq!(builder.options.reconnect.max_attempts, 2);
        assert_eq!(builder.options.reconnect.base_delay_ms, 50);
        assert_eq!(builder.options.reconnect.max_delay_ms, 400);
        assert_eq!(builder.options.queue_limit, Some(4));
        assert!(builder.options.on_event.is_some());
    }

    #[test]
    fn test_options_sets_origin() {
        let builder = ConnectionManager::builder()
            .options(ConnectionOptions::new("http://h").with_queue_limit(1));
        assert_eq!(builder.origin.as_deref(), Some("http://h"));
        assert_eq!(builder.options.queue_limit, Some(1));
    }

    #[test]
    fn test_invalid_settings_fail_validation() {
        let result = ConnectionManager::builder()
            .origin("http://h")
            .queue_limit(0)
            .connector(MockConnector::new())
            .build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_build_with_connector() {
        let connector = MockConnector::new();
        let manager = ConnectionManager::builder()
            .origin("https://app.local:8443")
            .base_path("/_debug")
            .connector(connector.clone())
            .build()
            .unwrap();

        assert_eq!(manager.url().as_str(), "wss://app.local:8443/_debug/ws");

        manager.connect();
        assert_eq!(connector.opened(), 1);
        assert_eq!(connector.urls()[0], *manager.url());
    }
}
