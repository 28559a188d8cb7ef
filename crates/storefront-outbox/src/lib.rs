//! Storefront Outbox: the transactional outbox pipeline.
//!
//! The [`writer::OutboxWriter`] appends event records inside the same
//! transaction as the domain write that produced them. The
//! [`dispatcher::PublishDispatcher`] polls the oldest unpublished records,
//! sends them to the message bus, and flags each one published once the bus
//! acknowledges it. Delivery is at-least-once.

pub mod config;
pub mod dispatcher;
pub mod writer;
