//! Publish dispatcher settings.

use std::collections::HashMap;
use std::time::Duration;

/// Default delay between dispatch cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Default maximum number of records drained per cycle.
pub const DEFAULT_BATCH_SIZE: u32 = 20;

/// Default topic for aggregate types without an explicit route.
pub const DEFAULT_TOPIC: &str = "products";

/// Default upper bound on a single bus send.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for the publish dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Whether the dispatcher task is started at all.
    pub enabled: bool,
    /// Delay between dispatch cycles.
    pub poll_interval: Duration,
    /// Maximum number of records drained per cycle.
    pub batch_size: u32,
    /// Topic used when an aggregate type has no route.
    pub default_topic: String,
    /// Aggregate type to topic overrides.
    pub topic_routes: HashMap<String, String>,
    /// Upper bound on a single bus send; expiry counts as a failed send.
    pub send_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
            default_topic: DEFAULT_TOPIC.to_owned(),
            topic_routes: HashMap::new(),
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

impl DispatcherConfig {
    /// Set the delay between cycles.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the maximum number of records drained per cycle.
    #[must_use]
    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the fallback topic.
    #[must_use]
    pub fn with_default_topic(mut self, topic: impl Into<String>) -> Self {
        self.default_topic = topic.into();
        self
    }

    /// Route events of `aggregate_type` to `topic`.
    #[must_use]
    pub fn with_topic_route(
        mut self,
        aggregate_type: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        self.topic_routes.insert(aggregate_type.into(), topic.into());
        self
    }

    /// Set the per-send timeout.
    #[must_use]
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Topic that events of `aggregate_type` are published to.
    #[must_use]
    pub fn topic_for(&self, aggregate_type: &str) -> &str {
        self.topic_routes
            .get(aggregate_type)
            .map_or(self.default_topic.as_str(), String::as_str)
    }
}
