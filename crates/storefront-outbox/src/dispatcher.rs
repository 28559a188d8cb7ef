//! Publish dispatcher.
//!
//! Each cycle drains up to `batch_size` of the oldest unpublished records and
//! sends every one of them concurrently. A record is flagged published only
//! after the bus acknowledges it; anything that fails stays unpublished and is
//! picked up again by a later cycle. There is no retry counter or backoff: the
//! poll interval is the retry schedule.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use storefront_core::bus::{BusError, MessageBus};
use storefront_core::error::DomainError;
use storefront_core::outbox::EventRecord;
use storefront_core::store::OutboxStore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::DispatcherConfig;

/// Tally of one dispatch cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Records returned by the unpublished query.
    pub fetched: usize,
    /// Records acknowledged by the bus and flagged published.
    pub published: usize,
    /// Records whose send failed or timed out.
    pub send_failures: usize,
    /// Records acknowledged by the bus but not flagged published.
    pub mark_failures: usize,
    /// Records that vanished from the store before they could be flagged.
    pub not_found: usize,
}

/// How a single record's publish attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Published,
    SendFailed,
    MarkFailed,
    NotFound,
}

/// Polls the outbox and publishes unpublished records to the bus.
pub struct PublishDispatcher {
    store: Arc<dyn OutboxStore>,
    bus: Arc<dyn MessageBus>,
    config: DispatcherConfig,
}

impl PublishDispatcher {
    /// Creates a dispatcher over `store` and `bus`.
    #[must_use]
    pub fn new(
        store: Arc<dyn OutboxStore>,
        bus: Arc<dyn MessageBus>,
        config: DispatcherConfig,
    ) -> Self {
        Self { store, bus, config }
    }

    /// Returns the dispatcher settings.
    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Runs one dispatch cycle and waits until every send in it has settled.
    ///
    /// Never fails: store and bus errors are logged and counted, and the
    /// affected records are retried by the next cycle.
    pub async fn run_cycle(&self) -> CycleReport {
        let batch = match self
            .store
            .list_oldest_unpublished(self.config.batch_size)
            .await
        {
            Ok(batch) => batch,
            Err(err) => {
                error!(error = %err, "failed to query unpublished outbox events");
                return CycleReport::default();
            }
        };

        let mut report = CycleReport {
            fetched: batch.len(),
            ..CycleReport::default()
        };
        if batch.is_empty() {
            return report;
        }
        debug!(count = batch.len(), "dispatching unpublished outbox events");

        let mut sends = JoinSet::new();
        for record in batch {
            let topic = self.config.topic_for(&record.aggregate_type).to_owned();
            sends.spawn(publish_one(
                Arc::clone(&self.store),
                Arc::clone(&self.bus),
                topic,
                record,
                self.config.send_timeout,
            ));
        }

        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok(Outcome::Published) => report.published += 1,
                Ok(Outcome::SendFailed) => report.send_failures += 1,
                Ok(Outcome::MarkFailed) => report.mark_failures += 1,
                Ok(Outcome::NotFound) => report.not_found += 1,
                Err(join_err) => {
                    error!(error = %join_err, "outbox publish task did not complete");
                    report.send_failures += 1;
                }
            }
        }

        if report.published == report.fetched {
            debug!(published = report.published, "outbox batch published");
        } else {
            info!(
                fetched = report.fetched,
                published = report.published,
                send_failures = report.send_failures,
                mark_failures = report.mark_failures,
                not_found = report.not_found,
                "outbox batch partially published; remaining events retry next cycle"
            );
        }
        report
    }

    /// Spawns the polling loop on the current tokio runtime.
    ///
    /// The first cycle runs immediately; each later cycle starts
    /// `poll_interval` after the previous one settled, however long that
    /// cycle took.
    #[must_use]
    pub fn start(self) -> DispatcherHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(cancel.clone()));
        DispatcherHandle { cancel, task }
    }

    async fn run(self, cancel: CancellationToken) {
        info!(
            poll_interval_ms = u64::try_from(self.config.poll_interval.as_millis()).unwrap_or(u64::MAX),
            batch_size = self.config.batch_size,
            default_topic = %self.config.default_topic,
            "publish dispatcher started"
        );

        loop {
            self.run_cycle().await;
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!("publish dispatcher stopped");
    }
}

/// Sends one record and, on acknowledgment, flags it published.
async fn publish_one(
    store: Arc<dyn OutboxStore>,
    bus: Arc<dyn MessageBus>,
    topic: String,
    record: EventRecord,
    send_timeout: Duration,
) -> Outcome {
    let sent = tokio::time::timeout(send_timeout, bus.send(&topic, &record.payload))
        .await
        .unwrap_or(Err(BusError::Timeout(send_timeout)));

    match sent {
        Ok(ack) => {
            debug!(
                event_id = %record.id,
                topic = %ack.topic,
                partition = ?ack.partition,
                offset = ?ack.offset,
                "bus acknowledged outbox event"
            );
        }
        Err(err) => {
            let pending_ms = (Utc::now() - record.created_at).num_milliseconds();
            warn!(
                event_id = %record.id,
                aggregate_id = %record.aggregate_id,
                %topic,
                pending_ms,
                error = %err,
                "bus send failed; event stays unpublished"
            );
            return Outcome::SendFailed;
        }
    }

    match store.mark_published(record.id).await {
        Ok(()) => Outcome::Published,
        Err(DomainError::EventNotFound(event_id)) => {
            warn!(%event_id, "published event no longer in outbox");
            Outcome::NotFound
        }
        Err(err) => {
            error!(
                event_id = %record.id,
                error = %err,
                "failed to mark event published; it will be sent again"
            );
            Outcome::MarkFailed
        }
    }
}

/// Handle to a running dispatcher task.
#[derive(Debug)]
pub struct DispatcherHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Stops the polling loop, letting an in-flight cycle settle first.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.task.await {
            error!(error = %err, "publish dispatcher task failed");
        }
    }
}
