//! Message bus boundary.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Confirmation that the bus accepted a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgement {
    /// Topic the message was written to.
    pub topic: String,
    /// Partition assigned by the broker, when it reports one.
    pub partition: Option<i32>,
    /// Offset assigned by the broker, when it reports one.
    pub offset: Option<i64>,
}

impl Acknowledgement {
    /// An acknowledgment carrying no broker position.
    #[must_use]
    pub fn for_topic(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            partition: None,
            offset: None,
        }
    }
}

/// Failure to deliver a single message.
#[derive(Debug, Error)]
pub enum BusError {
    /// The bus could not be reached.
    #[error("bus unavailable: {0}")]
    Unavailable(String),

    /// The bus refused the message.
    #[error("bus rejected message: {0}")]
    Rejected(String),

    /// No acknowledgment arrived within the send timeout.
    #[error("no acknowledgment within {0:?}")]
    Timeout(Duration),
}

/// Asynchronous publish API of the external message bus.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Sends `payload` to `topic`, resolving once the bus acknowledges it.
    async fn send(&self, topic: &str, payload: &str) -> Result<Acknowledgement, BusError>;
}
