//! `PostgreSQL` implementation of the store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres};
use uuid::Uuid;

use storefront_core::error::DomainError;
use storefront_core::outbox::EventRecord;
use storefront_core::store::{EntityRecord, OutboxStore, Transaction, TransactionalStore};

fn persistence(context: &str, err: &sqlx::Error) -> DomainError {
    DomainError::Persistence(format!("{context}: {err}"))
}

/// Row shape of `outbox_events`.
#[derive(Debug, FromRow)]
struct OutboxRow {
    event_id: Uuid,
    aggregate_type: String,
    aggregate_id: Uuid,
    event_type: String,
    payload: String,
    published: bool,
    created_at: DateTime<Utc>,
}

impl From<OutboxRow> for EventRecord {
    fn from(row: OutboxRow) -> Self {
        Self {
            id: row.event_id,
            aggregate_type: row.aggregate_type,
            aggregate_id: row.aggregate_id,
            event_type: row.event_type,
            payload: row.payload,
            published: row.published,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL-backed entity and outbox store.
#[derive(Debug, Clone)]
pub struct PgOutboxStore {
    pool: PgPool,
}

impl PgOutboxStore {
    /// Creates a new `PgOutboxStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// An open `PostgreSQL` transaction. Rolled back by sqlx if dropped uncommitted.
struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn put_entity(&mut self, entity: &EntityRecord) -> Result<(), DomainError> {
        sqlx::query(
            r"
            INSERT INTO entities (entity_type, entity_id, body, created_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(&entity.entity_type)
        .bind(entity.id)
        .bind(&entity.body)
        .bind(entity.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| persistence("entity insert failed", &e))?;

        Ok(())
    }

    async fn append_event(&mut self, record: &EventRecord) -> Result<(), DomainError> {
        sqlx::query(
            r"
            INSERT INTO outbox_events
                (event_id, aggregate_type, aggregate_id, event_type, payload, published, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(record.id)
        .bind(&record.aggregate_type)
        .bind(record.aggregate_id)
        .bind(&record.event_type)
        .bind(&record.payload)
        .bind(record.published)
        .bind(record.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| persistence("outbox append failed", &e))?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .commit()
            .await
            .map_err(|e| persistence("commit failed", &e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| persistence("rollback failed", &e))
    }
}

#[async_trait]
impl TransactionalStore for PgOutboxStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, DomainError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| persistence("could not open transaction", &e))?;
        Ok(Box::new(PgTransaction { tx }))
    }
}

#[async_trait]
impl OutboxStore for PgOutboxStore {
    async fn list_oldest_unpublished(&self, limit: u32) -> Result<Vec<EventRecord>, DomainError> {
        let rows: Vec<OutboxRow> = sqlx::query_as(
            r"
            SELECT event_id, aggregate_type, aggregate_id, event_type, payload, published, created_at
            FROM outbox_events
            WHERE NOT published
            ORDER BY created_at ASC, position ASC
            LIMIT $1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| persistence("unpublished query failed", &e))?;

        Ok(rows.into_iter().map(EventRecord::from).collect())
    }

    async fn mark_published(&self, event_id: Uuid) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE outbox_events SET published = TRUE WHERE event_id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await
            .map_err(|e| persistence("mark published failed", &e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::EventNotFound(event_id));
        }
        tracing::debug!(%event_id, "outbox event marked published");
        Ok(())
    }
}
