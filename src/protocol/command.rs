//! Outbound command types.
//!
//! Every frame the overlay sends is a JSON object carrying a `type`
//! discriminant plus an arbitrary payload.
//!
//! # Built-in Commands
//!
//! | `type` | Payload |
//! |--------|---------|
//! | `subscribe` | `panels` |
//! | `unsubscribe` | `panels` |
//! | `snapshot` | none |
//! | `clear` | `panels` |
//!
//! [`Command`] models the built-in vocabulary. [`PendingCommand`] is the
//! open-ended form that [`ConnectionManager::send_command`] accepts and
//! queues.
//!
//! [`ConnectionManager::send_command`]: crate::client::ConnectionManager::send_command

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

// ============================================================================
// Command
// ============================================================================

/// Built-in commands understood by the overlay server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Command {
    /// Start streaming events for the given panels.
    Subscribe {
        /// Panel names.
        panels: Vec<String>,
    },

    /// Stop streaming events for the given panels.
    Unsubscribe {
        /// Panel names.
        panels: Vec<String>,
    },

    /// Ask the server for the full current state of every panel.
    Snapshot,

    /// Drop server-side history for the given panels.
    Clear {
        /// Panel names.
        panels: Vec<String>,
    },
}

impl Command {
    /// Returns the wire discriminant.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Subscribe { .. } => "subscribe",
            Self::Unsubscribe { .. } => "unsubscribe",
            Self::Snapshot => "snapshot",
            Self::Clear { .. } => "clear",
        }
    }

    /// Builds a `subscribe` command.
    #[must_use]
    pub fn subscribe<I, S>(panels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Subscribe {
            panels: collect_panels(panels),
        }
    }

    /// Builds an `unsubscribe` command.
    #[must_use]
    pub fn unsubscribe<I, S>(panels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Unsubscribe {
            panels: collect_panels(panels),
        }
    }

    /// Builds a `clear` command.
    #[must_use]
    pub fn clear<I, S>(panels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Clear {
            panels: collect_panels(panels),
        }
    }
}

fn collect_panels<I, S>(panels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    panels.into_iter().map(Into::into).collect()
}

// ============================================================================
// PendingCommand
// ============================================================================

/// A command value object: `{ "type": ..., ...payload }`.
///
/// Only commands with a non-empty `type` are valid; invalid commands are
/// dropped by the manager instead of being sent or queued.
///
/// # Format
///
/// ```json
/// { "type": "subscribe", "panels": ["logs", "queries"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingCommand {
    /// Wire discriminant.
    #[serde(rename = "type", default)]
    kind: String,

    /// Remaining fields, sent verbatim.
    #[serde(flatten)]
    payload: Map<String, Value>,
}

impl PendingCommand {
    /// Creates a command of the given type with an empty payload.
    #[inline]
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Map::new(),
        }
    }

    /// Adds a payload field.
    ///
    /// A `type` key replaces the discriminant when it holds a string and is
    /// ignored otherwise, so the serialized object never carries two `type`s.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        if key == "type" {
            if let Value::String(kind) = value {
                self.kind = kind;
            }
        } else {
            self.payload.insert(key, value);
        }
        self
    }

    /// Builds a command from an arbitrary JSON value.
    ///
    /// Never fails: anything that is not an object, or has no string `type`,
    /// yields an invalid command (see [`is_valid`](Self::is_valid)).
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut payload) = value else {
            return Self::default();
        };

        let kind = match payload.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => String::new(),
        };

        Self { kind, payload }
    }

    /// Returns the wire discriminant (empty for invalid commands).
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the payload fields.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Returns `true` when the command carries a non-empty `type`.
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.kind.is_empty()
    }

    /// Serializes to a JSON text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidCommand`] if the command has no `type`
    /// - [`Error::Json`] if a payload value cannot be serialized
    pub fn to_json(&self) -> Result<String> {
        if !self.is_valid() {
            return Err(Error::invalid_command("missing `type`"));
        }
        Ok(serde_json::to_string(self)?)
    }
}

impl From<Command> for PendingCommand {
    fn from(command: Command) -> Self {
        let base = Self::new(command.kind());
        match command {
            Command::Subscribe { panels }
            | Command::Unsubscribe { panels }
            | Command::Clear { panels } => base.with("panels", panels),
            Command::Snapshot => base,
        }
    }
}

impl From<Value> for PendingCommand {
    #[inline]
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

// ============================================================================
// Tests
// ============================================================================
