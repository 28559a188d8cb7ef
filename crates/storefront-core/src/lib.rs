//! Storefront Core: shared outbox abstractions.
//!
//! This crate defines the event record, the store and bus boundaries, and the
//! unit-of-work helper that every other crate builds on. It contains no
//! infrastructure code.

pub mod bus;
pub mod clock;
pub mod error;
pub mod outbox;
pub mod store;
pub mod unit_of_work;
