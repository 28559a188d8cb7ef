//! Outbox event records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A domain event captured in the outbox, awaiting publication to the bus.
///
/// Every field except `published` is fixed at creation. The payload is the
/// exact text sent to the bus, however late publication happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique event identifier.
    pub id: Uuid,
    /// Kind of entity the event concerns (e.g. `"Product"`).
    pub aggregate_type: String,
    /// Identifier of the entity instance.
    pub aggregate_id: Uuid,
    /// Kind of event (e.g. `"ProductCreated"`).
    pub event_type: String,
    /// Serialized snapshot of the entity at event-creation time.
    pub payload: String,
    /// Whether the bus has acknowledged this event.
    pub published: bool,
    /// Timestamp of event creation.
    pub created_at: DateTime<Utc>,
}

impl EventRecord {
    /// Creates a new unpublished record with a fresh identifier.
    #[must_use]
    pub fn new(
        aggregate_type: impl Into<String>,
        aggregate_id: Uuid,
        event_type: impl Into<String>,
        payload: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregate_type: aggregate_type.into(),
            aggregate_id,
            event_type: event_type.into(),
            payload,
            published: false,
            created_at,
        }
    }
}
