use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Product lifecycle event types this engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Create,
    Update,
    Delete,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Create => "create",
            EventKind::Update => "update",
            EventKind::Delete => "delete",
        }
    }

    /// `None` for types this consumer does not know; the indexer drops
    /// those instead of stalling the partition.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(EventKind::Create),
            "update" => Some(EventKind::Update),
            "delete" => Some(EventKind::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event appended to the log. Immutable once published; only its
/// delivery bookkeeping changes afterwards.
///
/// `event_type` stays a plain string on the wire so foreign producers can
/// emit types this consumer does not know; dispatch happens at processing
/// time via [`ProductEvent::kind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductEvent {
    pub event_type: String,
    pub product_id: String,
    /// JSON product document for create/update, empty for delete.
    #[serde(default)]
    pub payload: String,
    /// Producer-assigned; monotonic per producer, not globally ordered.
    pub timestamp: DateTime<Utc>,
}

impl ProductEvent {
    pub fn new(kind: EventKind, product_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            event_type: kind.as_str().to_string(),
            product_id: product_id.into(),
            payload: payload.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn kind(&self) -> Option<EventKind> {
        EventKind::parse(&self.event_type)
    }
}

/// Log-assigned delivery handle: partition plus offset within it.
/// Distinct from any business identifier; used only for acknowledgement
/// and redelivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryId {
    pub partition: u32,
    pub offset: u64,
}

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.partition, self.offset)
    }
}

/// An entry handed to one consumer of a group.
#[derive(Debug, Clone)]
pub struct ClaimedEvent {
    pub delivery_id: DeliveryId,
    pub event: ProductEvent,
}
