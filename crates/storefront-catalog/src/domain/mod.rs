//! Domain types for the product catalog.

pub mod commands;
pub mod events;
pub mod product;
