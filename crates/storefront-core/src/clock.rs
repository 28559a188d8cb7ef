//! Clock abstraction for determinism.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};

/// Abstraction over system time so event timestamps can be pinned in tests.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system clock.
///
/// Timestamps are truncated to microseconds, the precision of a Postgres
/// `TIMESTAMPTZ`, so a record reads back exactly as it was written.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let now = Utc::now();
        now.duration_trunc(TimeDelta::microseconds(1)).unwrap_or(now)
    }
}
