//! Clock abstraction for determinism.

use chrono::{DateTime, Utc};

/// Abstraction over wall-clock time, injected wherever the orchestrator
/// timestamps work (poller start, timeout diagnostics).
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Milliseconds elapsed since `since`, clamped at zero.
    fn elapsed_ms(&self, since: DateTime<Utc>) -> u64 {
        u64::try_from((self.now() - since).num_milliseconds()).unwrap_or(0)
    }
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
