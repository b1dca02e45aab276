//! Inbound event types.
//!
//! The server pushes JSON text frames of arbitrary shape. They are kept
//! verbatim in [`Event`] and can be interpreted with [`Event::parse`].
//!
//! # Event Types
//!
//! | `type` | Variant |
//! |--------|---------|
//! | `snapshot` | [`ParsedEvent::Snapshot`] |
//! | `event`, `update` | [`ParsedEvent::PanelUpdate`] |
//! | `cleared` | [`ParsedEvent::Cleared`] |
//! | `subscribed` | [`ParsedEvent::Subscribed`] |
//! | `unsubscribed` | [`ParsedEvent::Unsubscribed`] |
//! | anything else | [`ParsedEvent::Unknown`] |

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Map, Value};

// ============================================================================
// Event
// ============================================================================

/// A parsed inbound frame.
///
/// # Format
///
/// ```json
/// { "type": "event", "panel": "logs", "data": { ... } }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    raw: Value,
}

impl Event {
    /// Wraps an already parsed value.
    #[inline]
    #[must_use]
    pub const fn new(raw: Value) -> Self {
        Self { raw }
    }

    /// Parses a text frame.
    ///
    /// Returns `None` for anything that is not valid JSON.
    #[must_use]
    pub fn from_text(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok().map(Self::new)
    }

    /// Returns the `type` discriminant, if present.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.raw.get("type").and_then(Value::as_str)
    }

    /// Returns the `panel` field, if present.
    #[inline]
    #[must_use]
    pub fn panel(&self) -> Option<&str> {
        self.raw.get("panel").and_then(Value::as_str)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.raw
    }

    /// Consumes the event, returning the raw value.
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        self.raw
    }

    /// Parses the event into a typed variant.
    #[must_use]
    pub fn parse(&self) -> ParsedEvent {
        match self.kind() {
            Some("snapshot") => ParsedEvent::Snapshot {
                panels: self
                    .raw
                    .get("panels")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
            },

            Some("event" | "update") => ParsedEvent::PanelUpdate {
                panel: self.panel().unwrap_or_default().to_string(),
                data: self.raw.get("data").cloned().unwrap_or(Value::Null),
            },

            Some("cleared") => ParsedEvent::Cleared {
                panels: self.panel_list(),
            },

            Some("subscribed") => ParsedEvent::Subscribed {
                panels: self.panel_list(),
            },

            Some("unsubscribed") => ParsedEvent::Unsubscribed {
                panels: self.panel_list(),
            },

            kind => ParsedEvent::Unknown {
                kind: kind.map(str::to_string),
                raw: self.raw.clone(),
            },
        }
    }

    /// Reads `panels` as a list of names, falling back to a single `panel`.
    fn panel_list(&self) -> Vec<String> {
        match self.raw.get("panels").and_then(Value::as_array) {
            Some(panels) => panels
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            None => self.panel().map(str::to_string).into_iter().collect(),
        }
    }
}

impl From<Value> for Event {
    #[inline]
    fn from(raw: Value) -> Self {
        Self::new(raw)
    }
}

// ============================================================================
// ParsedEvent
// ============================================================================

/// Typed view of an inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEvent {
    /// Full state of every panel.
    Snapshot {
        /// Panel name to panel payload.
        panels: Map<String, Value>,
    },

    /// Incremental data for one panel.
    PanelUpdate {
        /// Panel name (empty if the server omitted it).
        panel: String,
        /// Panel payload.
        data: Value,
    },

    /// Server acknowledged a `clear`.
    Cleared {
        /// Cleared panels.
        panels: Vec<String>,
    },

    /// Server acknowledged a `subscribe`.
    Subscribed {
        /// Subscribed panels.
        panels: Vec<String>,
    },

    /// Server acknowledged an `unsubscribe`.
    Unsubscribed {
        /// Unsubscribed panels.
        panels: Vec<String>,
    },

    /// Anything this client does not recognize yet.
    Unknown {
        /// The `type` field, if there was one.
        kind: Option<String>,
        /// The full frame.
        raw: Value,
    },
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_from_text_rejects_non_json() {
        assert!(Event::from_text("not json").is_none());
        assert!(Event::from_text("").is_none());
    }

    #[test]
    fn test_from_text_accepts_any_json() {
        assert_eq!(Event::from_text("5").unwrap().as_value(), &json!(5));
        assert!(Event::from_text("5").unwrap().kind().is_none());
    }

    #[test]
    fn test_parse_panel_update() {
        let event = Event::new(json!({ "type": "event", "panel": "logs", "data": { "msg": "hi" } }));
        assert_eq!(
            event.parse(),
            ParsedEvent::PanelUpdate {
                panel: "logs".into(),
                data: json!({ "msg": "hi" }),
            }
        );
    }

    #[test]
    fn test_parse_snapshot() {
        let event = Event::new(json!({ "type": "snapshot", "panels": { "logs": [] } }));
        let ParsedEvent::Snapshot { panels } = event.parse() else {
            panic!("expected snapshot");
        };
        assert_eq!(panels.get("logs"), Some(&json!([])));
    }

    #[test]
    fn test_parse_ack_with_single_panel() {
        let event = Event::new(json!({ "type": "cleared", "panel": "queries" }));
        assert_eq!(
            event.parse(),
            ParsedEvent::Cleared {
                panels: vec!["queries".into()],
            }
        );
    }

    #[test]
    fn test_parse_unknown_keeps_raw() {
        let raw = json!({ "type": "heartbeat", "n": 1 });
        let event = Event::new(raw.clone());
        assert_eq!(
            event.parse(),
            ParsedEvent::Unknown {
                kind: Some("heartbeat".into()),
                raw,
            }
        );
    }
}
