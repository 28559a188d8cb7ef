//! Storefront Bus: `MessageBus` implementations.
//!
//! - [`kafka_rest::KafkaRestBus`] produces to Kafka through a REST proxy.
//! - [`channel::ChannelBus`] delivers to in-process subscribers.

pub mod channel;
pub mod kafka_rest;
