//! Small shared helpers: monotonic ids and wall-clock timestamps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock time in nanoseconds since the Unix epoch.
///
/// Used for order admission timestamps and journal entries. Not monotonic
/// across clock adjustments; sequencing correctness relies on the sequence
/// number, not this timestamp.
#[must_use]
pub fn current_time_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// A simple process-wide monotonic counter used to mint ids.
///
/// Each domain (orders, trades, sequence numbers) owns its own generator so
/// that exhausting one counter never perturbs another.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    #[must_use]
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Returns the next id in the sequence, starting from the generator's
    /// configured first value and incrementing by one each call.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
