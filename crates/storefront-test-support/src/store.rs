//! In-memory store: a `TransactionalStore` + `OutboxStore` for tests.
//!
//! Transactions buffer their writes and apply them to the shared state only
//! on commit, so atomicity can be asserted without a database. Individual
//! operations can be made to fail with [`StoreFault`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use storefront_core::error::DomainError;
use storefront_core::outbox::EventRecord;
use storefront_core::store::{EntityRecord, OutboxStore, Transaction, TransactionalStore};
use uuid::Uuid;

/// An operation that can be forced to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreFault {
    /// Opening a transaction.
    Begin,
    /// Inserting an entity.
    PutEntity,
    /// Appending an event record.
    AppendEvent,
    /// Committing a transaction.
    Commit,
    /// Listing unpublished records.
    ListUnpublished,
    /// Marking a record published.
    MarkPublished,
}

#[derive(Debug, Default)]
struct State {
    entities: Vec<EntityRecord>,
    events: Vec<EventRecord>,
    faults: HashSet<StoreFault>,
    mark_calls: Vec<Uuid>,
    rollbacks: usize,
}

impl State {
    fn check(&self, fault: StoreFault) -> Result<(), DomainError> {
        if self.faults.contains(&fault) {
            return Err(DomainError::Persistence(format!(
                "injected {fault:?} failure"
            )));
        }
        Ok(())
    }
}

/// Shared in-memory store. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Make `fault` fail until [`InMemoryStore::heal`] is called.
    pub fn inject(&self, fault: StoreFault) {
        self.lock().faults.insert(fault);
    }

    /// Stop failing `fault`.
    pub fn heal(&self, fault: StoreFault) {
        self.lock().faults.remove(&fault);
    }

    /// Insert an already-committed event record, bypassing transactions.
    pub fn seed_event(&self, record: EventRecord) {
        self.lock().events.push(record);
    }

    /// Snapshot of committed entities in insertion order.
    #[must_use]
    pub fn entities(&self) -> Vec<EntityRecord> {
        self.lock().entities.clone()
    }

    /// Snapshot of committed event records in insertion order.
    #[must_use]
    pub fn events(&self) -> Vec<EventRecord> {
        self.lock().events.clone()
    }

    /// Looks up a committed event record.
    #[must_use]
    pub fn event(&self, event_id: Uuid) -> Option<EventRecord> {
        self.lock().events.iter().find(|e| e.id == event_id).cloned()
    }

    /// Every id passed to `mark_published`, in call order.
    #[must_use]
    pub fn mark_calls(&self) -> Vec<Uuid> {
        self.lock().mark_calls.clone()
    }

    /// Number of transactions rolled back explicitly.
    #[must_use]
    pub fn rollbacks(&self) -> usize {
        self.lock().rollbacks
    }
}

/// A transaction over an [`InMemoryStore`].
#[derive(Debug)]
struct InMemoryTransaction {
    state: Arc<Mutex<State>>,
    entities: Vec<EntityRecord>,
    events: Vec<EventRecord>,
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn put_entity(&mut self, entity: &EntityRecord) -> Result<(), DomainError> {
        let state = self.state.lock().unwrap();
        state.check(StoreFault::PutEntity)?;
        let duplicate = state
            .entities
            .iter()
            .chain(&self.entities)
            .any(|e| e.entity_type == entity.entity_type && e.id == entity.id);
        if duplicate {
            return Err(DomainError::Persistence(format!(
                "duplicate entity {}/{}",
                entity.entity_type, entity.id
            )));
        }
        drop(state);
        self.entities.push(entity.clone());
        Ok(())
    }

    async fn append_event(&mut self, record: &EventRecord) -> Result<(), DomainError> {
        let state = self.state.lock().unwrap();
        state.check(StoreFault::AppendEvent)?;
        if state.events.iter().chain(&self.events).any(|e| e.id == record.id) {
            return Err(DomainError::Persistence(format!(
                "duplicate event record {}",
                record.id
            )));
        }
        drop(state);
        self.events.push(record.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let Self {
            state,
            entities,
            events,
        } = *self;
        let mut guard = state.lock().unwrap();
        guard.check(StoreFault::Commit)?;
        guard.entities.extend(entities);
        guard.events.extend(events);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.state.lock().unwrap().rollbacks += 1;
        Ok(())
    }
}

#[async_trait]
impl TransactionalStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, DomainError> {
        self.lock().check(StoreFault::Begin)?;
        Ok(Box::new(InMemoryTransaction {
            state: Arc::clone(&self.state),
            entities: Vec::new(),
            events: Vec::new(),
        }))
    }
}

#[async_trait]
impl OutboxStore for InMemoryStore {
    async fn list_oldest_unpublished(&self, limit: u32) -> Result<Vec<EventRecord>, DomainError> {
        let state = self.lock();
        state.check(StoreFault::ListUnpublished)?;
        let mut pending: Vec<EventRecord> =
            state.events.iter().filter(|e| !e.published).cloned().collect();
        // Stable sort keeps insertion order for equal timestamps.
        pending.sort_by_key(|e| e.created_at);
        pending.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(pending)
    }

    async fn mark_published(&self, event_id: Uuid) -> Result<(), DomainError> {
        let mut state = self.lock();
        state.mark_calls.push(event_id);
        state.check(StoreFault::MarkPublished)?;
        let record = state
            .events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or(DomainError::EventNotFound(event_id))?;
        record.published = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};

    use super::*;

    fn record_at(offset_secs: i64) -> EventRecord {
        let base = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        EventRecord::new(
            "Product",
            Uuid::new_v4(),
            "ProductCreated",
            "{}".into(),
            base + TimeDelta::seconds(offset_secs),
        )
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_invisible() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        tx.append_event(&record_at(0)).await.unwrap();

        assert!(store.events().is_empty());
        tx.commit().await.unwrap();
        assert_eq!(store.events().len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let store = InMemoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.append_event(&record_at(0)).await.unwrap();
        }

        assert!(store.events().is_empty());
    }

    #[tokio::test]
    async fn test_equal_timestamps_keep_insertion_order() {
        let store = InMemoryStore::new();
        let first = record_at(5);
        let mut second = record_at(5);
        second.payload = r#"{"n":2}"#.into();
        let older = record_at(1);
        store.seed_event(first.clone());
        store.seed_event(second.clone());
        store.seed_event(older.clone());

        let listed = store.list_oldest_unpublished(10).await.unwrap();

        let ids: Vec<Uuid> = listed.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![older.id, first.id, second.id]);
    }

    #[tokio::test]
    async fn test_injected_fault_can_be_healed() {
        let store = InMemoryStore::new();
        store.inject(StoreFault::ListUnpublished);

        assert!(store.list_oldest_unpublished(1).await.is_err());

        store.heal(StoreFault::ListUnpublished);
        assert!(store.list_oldest_unpublished(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_payload_is_kept_verbatim() {
        let store = InMemoryStore::new();
        let mut record = record_at(0);
        record.payload = serde_json::json!({"b": 1, "a": 2}).to_string();
        let expected = record.payload.clone();
        store.seed_event(record);

        let listed = store.list_oldest_unpublished(1).await.unwrap();

        assert_eq!(listed[0].payload, expected);
    }
}
