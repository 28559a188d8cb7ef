//! Outbox writer.
//!
//! Called from inside a unit of work, right after the domain write and before
//! commit. Any error returned here must abort the unit of work so the domain
//! write and its event commit or roll back together.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use storefront_core::clock::Clock;
use storefront_core::error::DomainError;
use storefront_core::outbox::EventRecord;
use storefront_core::store::Transaction;
use tracing::{debug, warn};
use uuid::Uuid;

/// Builds event records and appends them to the outbox.
#[derive(Clone)]
pub struct OutboxWriter {
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for OutboxWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboxWriter").finish_non_exhaustive()
    }
}

impl OutboxWriter {
    /// Creates a writer stamping records with `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Builds an unpublished record from `build_payload` and appends it in
    /// `tx`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Serialization` if the payload cannot be built or
    /// is blank, or the store's error if the append fails.
    pub async fn record_event<F>(
        &self,
        tx: &mut dyn Transaction,
        aggregate_type: &str,
        aggregate_id: Uuid,
        event_type: &str,
        build_payload: F,
    ) -> Result<EventRecord, DomainError>
    where
        F: FnOnce() -> Result<String, serde_json::Error> + Send,
    {
        let payload = build_payload().map_err(|e| {
            warn!(%aggregate_id, event_type, error = %e, "event payload serialization failed");
            DomainError::Serialization(format!("{event_type} payload: {e}"))
        })?;
        if payload.trim().is_empty() {
            return Err(DomainError::Serialization(format!(
                "{event_type} payload is empty"
            )));
        }

        let record = EventRecord::new(
            aggregate_type,
            aggregate_id,
            event_type,
            payload,
            self.clock.now(),
        );
        tx.append_event(&record).await?;

        debug!(
            event_id = %record.id,
            aggregate_type,
            %aggregate_id,
            event_type,
            "event recorded in outbox"
        );
        Ok(record)
    }

    /// Records `snapshot`, serialized as JSON, as the event payload.
    ///
    /// # Errors
    ///
    /// See [`OutboxWriter::record_event`].
    pub async fn record_snapshot<T>(
        &self,
        tx: &mut dyn Transaction,
        aggregate_type: &str,
        aggregate_id: Uuid,
        event_type: &str,
        snapshot: &T,
    ) -> Result<EventRecord, DomainError>
    where
        T: Serialize + Sync + ?Sized,
    {
        self.record_event(tx, aggregate_type, aggregate_id, event_type, || {
            serde_json::to_string(snapshot)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use serde::ser::Error as _;
    use storefront_core::store::TransactionalStore;
    use storefront_core::unit_of_work::in_transaction;
    use storefront_test_support::{FixedClock, InMemoryStore, StoreFault};

    use super::*;

    fn writer_at_fixed_time() -> (OutboxWriter, chrono::DateTime<Utc>) {
        let fixed_now = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        (OutboxWriter::new(Arc::new(FixedClock(fixed_now))), fixed_now)
    }

    #[tokio::test]
    async fn test_record_event_appends_unpublished_record() {
        // Arrange
        let (writer, fixed_now) = writer_at_fixed_time();
        let store = InMemoryStore::new();
        let aggregate_id = Uuid::new_v4();
        let mut tx = store.begin().await.unwrap();

        // Act
        let record = writer
            .record_event(tx.as_mut(), "Product", aggregate_id, "ProductCreated", || {
                Ok(r#"{"name":"Lamp"}"#.to_owned())
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();

        // Assert
        let events = store.events();
        assert_eq!(events, vec![record.clone()]);
        assert!(!record.published);
        assert_eq!(record.aggregate_type, "Product");
        assert_eq!(record.aggregate_id, aggregate_id);
        assert_eq!(record.event_type, "ProductCreated");
        assert_eq!(record.payload, r#"{"name":"Lamp"}"#);
        assert_eq!(record.created_at, fixed_now);
    }

    #[tokio::test]
    async fn test_record_snapshot_serializes_as_json() {
        // Arrange
        let (writer, _) = writer_at_fixed_time();
        let store = InMemoryStore::new();
        let snapshot = BTreeMap::from([("name", "Lamp")]);
        let mut tx = store.begin().await.unwrap();

        // Act
        let record = writer
            .record_snapshot(tx.as_mut(), "Product", Uuid::new_v4(), "ProductCreated", &snapshot)
            .await
            .unwrap();

        // Assert
        assert_eq!(record.payload, r#"{"name":"Lamp"}"#);
    }

    #[tokio::test]
    async fn test_serialization_failure_rolls_back_unit_of_work() {
        // Arrange
        let (writer, _) = writer_at_fixed_time();
        let store = InMemoryStore::new();
        let aggregate_id = Uuid::new_v4();

        // Act
        let result = in_transaction(&store, move |tx| {
            Box::pin(async move {
                writer
                    .record_event(tx, "Product", aggregate_id, "ProductCreated", || {
                        Err(serde_json::Error::custom("unrepresentable price"))
                    })
                    .await
            })
        })
        .await;

        // Assert
        match result {
            Err(DomainError::Serialization(message)) => {
                assert!(message.contains("unrepresentable price"));
            }
            other => panic!("expected Serialization, got {other:?}"),
        }
        assert!(store.events().is_empty());
        assert_eq!(store.rollbacks(), 1);
    }

    #[tokio::test]
    async fn test_blank_payload_is_rejected() {
        let (writer, _) = writer_at_fixed_time();
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let result = writer
            .record_event(tx.as_mut(), "Product", Uuid::new_v4(), "ProductCreated", || {
                Ok("  ".to_owned())
            })
            .await;

        assert!(matches!(result, Err(DomainError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_append_failure_is_propagated() {
        let (writer, _) = writer_at_fixed_time();
        let store = InMemoryStore::new();
        store.inject(StoreFault::AppendEvent);
        let mut tx = store.begin().await.unwrap();

        let result = writer
            .record_event(tx.as_mut(), "Product", Uuid::new_v4(), "ProductCreated", || {
                Ok("{}".to_owned())
            })
            .await;

        assert!(matches!(result, Err(DomainError::Persistence(_))));
    }
}
