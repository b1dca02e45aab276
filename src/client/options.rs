//! Connection options and callback slots.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use overlay_link::ConnectionOptions;
//!
//! let options = ConnectionOptions::new("https://app.local:8443")
//!     .with_base_path("/_debugbar/")
//!     .with_max_reconnect_attempts(5)
//!     .with_reconnect_delay(Duration::from_millis(500))
//!     .on_event(|event| println!("{:?}", event.parse()));
//!
//! assert_eq!(
//!     options.websocket_url()?.as_str(),
//!     "wss://app.local:8443/_debugbar/ws"
//! );
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::protocol::Event;

use super::backoff::ReconnectPolicy;
use super::status::ConnectionStatus;

// ============================================================================
// Types
// ============================================================================

/// Called for every inbound JSON frame.
pub type EventHandler = Arc<dyn Fn(Event) + Send + Sync>;

/// Called with the transport's error message.
pub type ErrorHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Called when the status changes.
pub type StatusHandler = Arc<dyn Fn(ConnectionStatus) + Send + Sync>;

// ============================================================================
// ConnectionOptions
// ============================================================================

/// Configuration for a [`ConnectionManager`](super::ConnectionManager).
#[derive(Clone)]
pub struct ConnectionOptions {
    /// Origin of the page hosting the overlay, e.g. `https://app.local`.
    ///
    /// Supplies host and port; `https` selects `wss`, anything else `ws`.
    pub origin: String,

    /// Path prefix of the overlay endpoint; `/ws` is appended.
    pub base_path: String,

    /// Reconnect budget and delays.
    pub reconnect: ReconnectPolicy,

    /// Maximum number of queued commands, `None` for unbounded.
    pub queue_limit: Option<usize>,

    pub(crate) on_event: Option<EventHandler>,
    pub(crate) on_error: Option<ErrorHandler>,
    pub(crate) on_status_change: Option<StatusHandler>,
}

// ============================================================================
// Constructors
// ============================================================================

impl ConnectionOptions {
    /// Creates options for the given page origin with default settings.
    #[must_use]
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            base_path: String::new(),
            reconnect: ReconnectPolicy::default(),
            queue_limit: None,
            on_event: None,
            on_error: None,
            on_status_change: None,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ConnectionOptions {
    /// Sets the endpoint path prefix.
    #[inline]
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Sets the number of reconnect attempts before giving up.
    #[inline]
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.reconnect.max_attempts = attempts;
        self
    }

    /// Sets the base reconnect delay.
    #[inline]
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect.base_delay_ms = duration_ms(delay);
        self
    }

    /// Sets the cap on the pre-jitter reconnect delay.
    #[inline]
    #[must_use]
    pub fn with_max_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect.max_delay_ms = duration_ms(delay);
        self
    }

    /// Replaces the whole reconnect policy.
    #[inline]
    #[must_use]
    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Bounds the pending command queue, evicting the oldest entry when full.
    #[inline]
    #[must_use]
    pub fn with_queue_limit(mut self, limit: usize) -> Self {
        self.queue_limit = Some(limit);
        self
    }

    /// Registers the inbound event callback.
    #[must_use]
    pub fn on_event<F>(mut self, handler: F) -> Self
    where
        F: Fn(Event) + Send + Sync + 'static,
    {
        self.on_event = Some(Arc::new(handler));
        self
    }

    /// Registers the transport error callback.
    #[must_use]
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(handler));
        self
    }

    /// Registers the status change callback.
    #[must_use]
    pub fn on_status_change<F>(mut self, handler: F) -> Self
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        self.on_status_change = Some(Arc::new(handler));
        self
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
#[inline]
fn duration_ms(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// URL Building
// ============================================================================

impl ConnectionOptions {
    /// Returns `base_path` with exactly one leading slash and no trailing
    /// slash, or an empty string for the root.
    #[must_use]
    pub fn normalized_base_path(&self) -> String {
        let trimmed = self.base_path.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }

    /// Builds `ws(s)://<host>/<base_path>/ws`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidUrl`] if the origin does not parse, has no host, or
    /// cannot carry a WebSocket scheme.
    pub fn websocket_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.origin).map_err(|e| Error::invalid_url(&self.origin, e))?;

        if url.host_str().is_none() {
            return Err(Error::invalid_url(&self.origin, "origin has no host"));
        }

        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme).map_err(|()| {
            Error::invalid_url(&self.origin, format!("cannot switch scheme to {scheme}"))
        })?;

        url.set_path(&format!("{}/ws", self.normalized_base_path()));
        url.set_query(None);
        url.set_fragment(None);

        Ok(url)
    }

    /// Checks the options without building anything.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] for a bad origin
    /// - [`Error::Config`] for an inconsistent reconnect policy or a zero
    ///   queue limit
    pub fn validate(&self) -> Result<()> {
        self.websocket_url()?;
        self.reconnect.validate()?;

        if self.queue_limit == Some(0) {
            return Err(Error::config("queue limit must be at least 1"));
        }

        Ok(())
    }
}

impl fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("origin", &self.origin)
            .field("base_path", &self.base_path)
            .field("reconnect", &self.reconnect)
            .field("queue_limit", &self.queue_limit)
            .field("on_event", &self.on_event.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_status_change", &self.on_status_change.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
