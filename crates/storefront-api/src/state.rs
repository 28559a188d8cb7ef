//! Shared application state.

use std::fmt;
use std::sync::Arc;

use storefront_core::clock::Clock;
use storefront_core::store::TransactionalStore;
use storefront_outbox::writer::OutboxWriter;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock for entity and event timestamps.
    pub clock: Arc<dyn Clock>,
    /// Store for entity writes and their outbox events.
    pub store: Arc<dyn TransactionalStore>,
    /// Appends events inside the request's unit of work.
    pub outbox_writer: OutboxWriter,
    /// Whether the publish dispatcher was started.
    pub dispatcher_enabled: bool,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("dispatcher_enabled", &self.dispatcher_enabled)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create new application state. The outbox writer shares `clock`.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        store: Arc<dyn TransactionalStore>,
        dispatcher_enabled: bool,
    ) -> Self {
        let outbox_writer = OutboxWriter::new(Arc::clone(&clock));
        Self {
            clock,
            store,
            outbox_writer,
            dispatcher_enabled,
        }
    }
}
