//! Command handlers for the product catalog.
//!
//! Each handler validates its command, then stores the entity and records
//! the matching outbox event inside one unit of work.

use storefront_core::clock::Clock;
use storefront_core::error::DomainError;
use storefront_core::store::TransactionalStore;
use storefront_core::unit_of_work::in_transaction;
use storefront_outbox::writer::OutboxWriter;
use tracing::info;

use crate::domain::commands::CreateProduct;
use crate::domain::events::{PRODUCT_AGGREGATE, PRODUCT_CREATED};
use crate::domain::product::Product;

/// Handles the `CreateProduct` command: validates the submission, stores the
/// product and records a `ProductCreated` event carrying its snapshot.
///
/// Nothing is written unless both writes succeed.
///
/// # Errors
///
/// Returns `DomainError::Validation` for invalid input,
/// `DomainError::Serialization` if the snapshot cannot be encoded, or
/// `DomainError::Persistence` if the store fails.
pub async fn handle_create_product(
    command: &CreateProduct,
    clock: &dyn Clock,
    store: &dyn TransactionalStore,
    writer: &OutboxWriter,
) -> Result<Product, DomainError> {
    let product = Product::create(
        command.name.as_deref(),
        command.price.as_deref(),
        clock.now(),
    )?;
    let entity = product.to_entity_record()?;
    let writer = writer.clone();

    let (product, event_id) = in_transaction(store, move |tx| {
        Box::pin(async move {
            tx.put_entity(&entity).await?;
            let record = writer
                .record_snapshot(tx, PRODUCT_AGGREGATE, product.id, PRODUCT_CREATED, &product)
                .await?;
            Ok((product, record.id))
        })
    })
    .await?;

    info!(
        correlation_id = %command.correlation_id,
        product_id = %product.id,
        %event_id,
        "product created"
    );
    Ok(product)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeDelta, TimeZone, Utc};
    use storefront_core::store::OutboxStore;
    use uuid::Uuid;

    use super::*;
    use storefront_test_support::{FixedClock, InMemoryStore, SteppingClock, StoreFault};

    fn fixed_clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn command(name: Option<&str>, price: Option<&str>) -> CreateProduct {
        CreateProduct {
            correlation_id: Uuid::new_v4(),
            name: name.map(str::to_owned),
            price: price.map(str::to_owned),
        }
    }

    #[tokio::test]
    async fn test_create_product_stores_entity_and_event_together() {
        // Arrange
        let clock = fixed_clock();
        let writer = OutboxWriter::new(Arc::new(clock));
        let store = InMemoryStore::new();

        // Act
        let product = handle_create_product(
            &command(Some("Test Product"), Some("18.99")),
            &clock,
            &store,
            &writer,
        )
        .await
        .unwrap();

        // Assert
        let entities = store.entities();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].entity_type, "Product");
        assert_eq!(entities[0].id, product.id);

        let events = store.events();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.aggregate_type, "Product");
        assert_eq!(event.aggregate_id, product.id);
        assert_eq!(event.event_type, "ProductCreated");
        assert!(!event.published);
        assert_eq!(event.created_at, clock.0);

        let payload: serde_json::Value = serde_json::from_str(&event.payload).unwrap();
        assert_eq!(payload["id"], product.id.to_string());
        assert_eq!(payload["name"], "Test Product");
        assert_eq!(payload["price"], 18.99);
        assert_eq!(payload, entities[0].body);
    }

    #[tokio::test]
    async fn test_invalid_product_writes_nothing() {
        // Arrange
        let clock = fixed_clock();
        let writer = OutboxWriter::new(Arc::new(clock));
        let store = InMemoryStore::new();

        // Act
        let result =
            handle_create_product(&command(Some(""), Some("0")), &clock, &store, &writer).await;

        // Assert
        match result {
            Err(DomainError::Validation(message)) => {
                assert!(message.contains("name must not be blank"));
                assert!(message.contains("price must be greater than 0"));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
        assert!(store.entities().is_empty());
        assert!(store.events().is_empty());
    }

    #[tokio::test]
    async fn test_failed_event_append_discards_entity() {
        // Arrange
        let clock = fixed_clock();
        let writer = OutboxWriter::new(Arc::new(clock));
        let store = InMemoryStore::new();
        store.inject(StoreFault::AppendEvent);

        // Act
        let result =
            handle_create_product(&command(Some("Lamp"), Some("25")), &clock, &store, &writer)
                .await;

        // Assert
        assert!(matches!(result, Err(DomainError::Persistence(_))));
        assert!(store.entities().is_empty());
        assert!(store.events().is_empty());
        assert_eq!(store.rollbacks(), 1);
    }

    #[tokio::test]
    async fn test_failed_entity_write_records_no_event() {
        let clock = fixed_clock();
        let writer = OutboxWriter::new(Arc::new(clock));
        let store = InMemoryStore::new();
        store.inject(StoreFault::PutEntity);

        let result =
            handle_create_product(&command(Some("Lamp"), Some("25")), &clock, &store, &writer)
                .await;

        assert!(matches!(result, Err(DomainError::Persistence(_))));
        assert!(store.events().is_empty());
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_store_unchanged() {
        let clock = fixed_clock();
        let writer = OutboxWriter::new(Arc::new(clock));
        let store = InMemoryStore::new();
        store.inject(StoreFault::Commit);

        let result =
            handle_create_product(&command(Some("Lamp"), Some("25")), &clock, &store, &writer)
                .await;

        assert!(matches!(result, Err(DomainError::Persistence(_))));
        assert!(store.entities().is_empty());
        assert!(store.events().is_empty());
    }

    #[tokio::test]
    async fn test_products_created_in_sequence_are_listed_oldest_first() {
        // Arrange
        let clock = Arc::new(SteppingClock::new(
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
            TimeDelta::seconds(1),
        ));
        let writer = OutboxWriter::new(clock.clone());
        let store = InMemoryStore::new();

        // Act
        let mut created = Vec::new();
        for (name, price) in [("Lamp", "25"), ("Desk", "199.50"), ("Chair", "89.99")] {
            let product = handle_create_product(
                &command(Some(name), Some(price)),
                clock.as_ref(),
                &store,
                &writer,
            )
            .await
            .unwrap();
            created.push(product.id);
        }
        let pending = store.list_oldest_unpublished(20).await.unwrap();

        // Assert
        let order: Vec<Uuid> = pending.iter().map(|event| event.aggregate_id).collect();
        assert_eq!(order, created);
        assert!(
            pending
                .windows(2)
                .all(|pair| pair[0].created_at < pair[1].created_at)
        );

        store.mark_published(pending[0].id).await.unwrap();
        assert!(store.event(pending[0].id).unwrap().published);
        assert!(!store.event(pending[1].id).unwrap().published);
        let remaining = store.list_oldest_unpublished(20).await.unwrap();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].aggregate_id, created[1]);
    }
}
