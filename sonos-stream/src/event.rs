//! Event types for the sonos-stream crate.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// Value of one evented variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventValue {
    /// A plain value
    Text(String),
    /// Per-channel values (`Master`, `LF`, `RF`), as sent for RenderingControl
    /// `Volume`, `Mute` and `Loudness`
    Channels(IndexMap<String, String>),
}

impl EventValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            EventValue::Text(text) => Some(text),
            EventValue::Channels(_) => None,
        }
    }

    pub fn as_channels(&self) -> Option<&IndexMap<String, String>> {
        match self {
            EventValue::Channels(channels) => Some(channels),
            EventValue::Text(_) => None,
        }
    }
}

/// Variables of one NOTIFY body, keyed by lower_snake_case name
pub type EventVariables = IndexMap<String, EventValue>;

/// A parsed notification delivered to a subscription's consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Subscription the notification was addressed to
    pub sid: String,
    /// Device-side sequence number (`SEQ` header); 0 when absent
    pub seq: u64,
    /// Service that produced the event, e.g. `AVTransport`
    pub service_id: String,
    /// When the notification was received
    pub timestamp: DateTime<Utc>,
    pub variables: EventVariables,
}

impl Event {
    pub fn new(
        sid: impl Into<String>,
        seq: u64,
        service_id: impl Into<String>,
        variables: EventVariables,
    ) -> Self {
        Self {
            sid: sid.into(),
            seq,
            service_id: service_id.into(),
            timestamp: Utc::now(),
            variables,
        }
    }

    pub fn get(&self, name: &str) -> Option<&EventValue> {
        self.variables.get(name)
    }

    /// Text value of `name`, if present and not a channel map
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(EventValue::as_text)
    }

    /// Value of `name` for one channel
    pub fn channel(&self, name: &str, channel: &str) -> Option<&str> {
        self.get(name)
            .and_then(EventValue::as_channels)
            .and_then(|channels| channels.get(channel))
            .map(String::as_str)
    }
}
