//! In-process bus backed by a tokio broadcast channel.

use async_trait::async_trait;
use storefront_core::bus::{Acknowledgement, BusError, MessageBus};
use tokio::sync::broadcast;

/// Default number of messages buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 1024;

/// A message delivered by [`ChannelBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Topic the message was sent to.
    pub topic: String,
    /// Message payload.
    pub payload: String,
}

/// Bus that fans every message out to in-process subscribers.
///
/// A send is acknowledged once the message is queued for at least one
/// subscriber; with nobody subscribed it fails and the event stays in the
/// outbox.
#[derive(Debug, Clone)]
pub struct ChannelBus {
    sender: broadcast::Sender<BusMessage>,
}

impl ChannelBus {
    /// Creates a bus buffering up to `capacity` messages per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to every message sent from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.sender.subscribe()
    }
}

impl Default for ChannelBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl MessageBus for ChannelBus {
    async fn send(&self, topic: &str, payload: &str) -> Result<Acknowledgement, BusError> {
        let message = BusMessage {
            topic: topic.to_owned(),
            payload: payload.to_owned(),
        };
        self.sender
            .send(message)
            .map_err(|_| BusError::Unavailable(format!("no subscribers on {topic}")))?;
        Ok(Acknowledgement::for_topic(topic))
    }
}
