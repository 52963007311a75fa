use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{RelayError, Result};

/// Identifier for an envelope (UUIDv7, time-sortable, display only).
///
/// Unique within the history window; never used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvelopeId(pub String);

impl EnvelopeId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EnvelopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EnvelopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the relay saw an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Originated through the ingress API.
    Sent,
    /// Observed arriving on a monitor queue.
    Received,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Sent => f.write_str("sent"),
            Direction::Received => f.write_str("received"),
        }
    }
}

/// The unit that flows through ingress, the history buffer and fan-out.
///
/// Wire: `{ "id": "...", "queue": "orders", "content": "{...}",
/// "timestamp": "2026-01-01T00:00:00.000Z", "type": "sent" }`
///
/// Envelopes are never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: EnvelopeId,
    pub queue: String,
    /// Opaque payload; the relay never reinterprets it.
    pub content: String,
    #[serde(with = "timestamp_millis")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub direction: Direction,
}

impl Envelope {
    /// Envelope for a message the ingress API just published.
    pub fn sent(queue: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: EnvelopeId::new(),
            queue: queue.into(),
            content: content.into(),
            timestamp: Utc::now(),
            direction: Direction::Sent,
        }
    }

    /// Envelope for a raw monitor-queue delivery. The body must be UTF-8.
    pub fn received(queue: impl Into<String>, body: &[u8]) -> Result<Self> {
        let queue = queue.into();
        let content = std::str::from_utf8(body).map_err(|e| RelayError::Parse {
            queue: queue.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            id: EnvelopeId::new(),
            queue,
            content: content.to_string(),
            timestamp: Utc::now(),
            direction: Direction::Received,
        })
    }
}

/// Current UTC time as RFC 3339 with millisecond precision and a `Z` suffix.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

mod timestamp_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
