//! Store boundaries: transactional writes and the outbox read side.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;
use crate::outbox::EventRecord;

/// Stored representation of a domain entity in the keyed record store.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    /// Kind of entity (e.g. `"Product"`).
    pub entity_type: String,
    /// Entity identifier; unique per entity type.
    pub id: Uuid,
    /// Serialized entity state.
    pub body: serde_json::Value,
    /// Timestamp of entity creation.
    pub created_at: DateTime<Utc>,
}

/// An open database transaction.
///
/// Writes staged through a transaction become visible together on `commit`
/// or not at all. Dropping a transaction without committing rolls it back.
#[async_trait]
pub trait Transaction: Send {
    /// Inserts a domain entity.
    async fn put_entity(&mut self, entity: &EntityRecord) -> Result<(), DomainError>;

    /// Appends an event record to the outbox.
    async fn append_event(&mut self, record: &EventRecord) -> Result<(), DomainError>;

    /// Commits every write staged in this transaction.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    /// Discards every write staged in this transaction.
    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}

/// A store that can open transactions spanning entity and outbox writes.
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    /// Opens a new transaction.
    async fn begin(&self) -> Result<Box<dyn Transaction>, DomainError>;
}

/// Read and acknowledge side of the outbox, used by the publish dispatcher.
///
/// Each call runs in its own short transaction.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Returns up to `limit` unpublished records, oldest `created_at` first,
    /// ties broken by insertion order.
    async fn list_oldest_unpublished(&self, limit: u32) -> Result<Vec<EventRecord>, DomainError>;

    /// Flags the record as published. Marking an already-published record
    /// succeeds without change.
    ///
    /// Returns `DomainError::EventNotFound` if no record has this id.
    async fn mark_published(&self, event_id: Uuid) -> Result<(), DomainError>;
}
