//! Storefront product catalog.
//!
//! Validates product submissions and stores each new product together with
//! its `ProductCreated` outbox event in a single transaction.

pub mod application;
pub mod domain;
