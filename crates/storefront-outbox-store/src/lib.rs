//! Storefront Outbox Store: PostgreSQL persistence for entities and the
//! transactional outbox.

pub mod pg_outbox_store;
pub mod schema;
