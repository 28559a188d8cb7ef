//! Shared test doubles for the Storefront catalog service.

mod bus;
mod clock;
mod store;

pub use bus::{FailingBus, RecordingBus, SentMessage, StalledBus};
pub use clock::{FixedClock, SteppingClock};
pub use store::{InMemoryStore, StoreFault};
