//! Application services for the product catalog.

pub mod command_handlers;
