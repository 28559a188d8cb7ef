//! Test buses: mock `MessageBus` implementations for tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use storefront_core::bus::{Acknowledgement, BusError, MessageBus};

/// A message accepted by a [`RecordingBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Topic the message was sent to.
    pub topic: String,
    /// Message payload.
    pub payload: String,
}

/// A bus that records every send. Acknowledges all messages except those
/// whose payload has been registered with [`RecordingBus::reject_payload`].
#[derive(Debug, Default)]
pub struct RecordingBus {
    sent: Mutex<Vec<SentMessage>>,
    rejected_payloads: Mutex<HashSet<String>>,
}

impl RecordingBus {
    /// Create a bus that acknowledges everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send of `payload` fail with `BusError::Rejected`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn reject_payload(&self, payload: impl Into<String>) {
        self.rejected_payloads.lock().unwrap().insert(payload.into());
    }

    /// Stop rejecting every payload.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn accept_all(&self) {
        self.rejected_payloads.lock().unwrap().clear();
    }

    /// Returns a snapshot of all acknowledged messages in arrival order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageBus for RecordingBus {
    async fn send(&self, topic: &str, payload: &str) -> Result<Acknowledgement, BusError> {
        if self.rejected_payloads.lock().unwrap().contains(payload) {
            return Err(BusError::Rejected(format!("payload refused on {topic}")));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(SentMessage {
            topic: topic.to_owned(),
            payload: payload.to_owned(),
        });
        Ok(Acknowledgement {
            topic: topic.to_owned(),
            partition: Some(0),
            offset: i64::try_from(sent.len() - 1).ok(),
        })
    }
}

/// A bus that is always down. Useful for testing outage recovery.
#[derive(Debug)]
pub struct FailingBus;

#[async_trait]
impl MessageBus for FailingBus {
    async fn send(&self, _topic: &str, _payload: &str) -> Result<Acknowledgement, BusError> {
        Err(BusError::Unavailable("connection refused".into()))
    }
}

/// A bus that never acknowledges. Useful for testing send timeouts.
#[derive(Debug)]
pub struct StalledBus;

#[async_trait]
impl MessageBus for StalledBus {
    async fn send(&self, _topic: &str, _payload: &str) -> Result<Acknowledgement, BusError> {
        std::future::pending().await
    }
}
