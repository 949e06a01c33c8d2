//! Reference rate feed (C2): current MNT/USD rate with validity flag,
//! fanned out to subscribers on change.

mod error;

pub use error::ReferenceRateError;

use crate::utils::current_time_nanos;
use crossbeam::atomic::AtomicCell;
use std::sync::{Arc, Mutex};
use tracing::{trace, warn};

/// A point-in-time reading of the external reference rate.
///
/// `valid` is explicit rather than implied by a zero rate: a stale or
/// disconnected feed must never be silently treated as a zero exchange
/// rate by a consumer doing arithmetic on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateSnapshot {
    pub micro_rate: i128,
    pub valid: bool,
    pub updated_at_ns: u64,
}

impl RateSnapshot {
    #[must_use]
    pub fn invalid() -> Self {
        Self {
            micro_rate: 0,
            valid: false,
            updated_at_ns: 0,
        }
    }
}

impl Default for RateSnapshot {
    fn default() -> Self {
        Self::invalid()
    }
}

type Listener = Arc<dyn Fn(RateSnapshot) + Send + Sync>;

/// Holds the latest reference rate behind a lock-free cell and fans out
/// updates to registered listeners synchronously, on the calling thread.
///
/// `MarketController` and the catalog's mark-price updater both subscribe;
/// the feed itself never calls back into them — it only ever pushes a
/// one-way tick, breaking the cyclic reference the source exhibited between
/// the feed and the position manager.
pub struct ReferenceRateFeed {
    current: AtomicCell<RateSnapshot>,
    listeners: Mutex<Vec<Listener>>,
}

impl std::fmt::Debug for ReferenceRateFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceRateFeed")
            .field("current", &self.current.load())
            .finish_non_exhaustive()
    }
}

impl Default for ReferenceRateFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceRateFeed {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: AtomicCell::new(RateSnapshot::invalid()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn current(&self) -> RateSnapshot {
        self.current.load()
    }

    /// Register a listener, invoked synchronously on every `update`/`mark_invalid`.
    pub fn subscribe(&self, listener: Listener) {
        self.listeners.lock().expect("reference rate listeners poisoned").push(listener);
    }

    /// Publish a new rate reading. Rejects non-positive rates outright
    /// rather than accepting and later dividing by (or trusting) garbage.
    pub fn update(&self, micro_rate: i128) -> Result<(), ReferenceRateError> {
        if micro_rate <= 0 {
            return Err(ReferenceRateError::NonPositiveRate { micro_rate });
        }
        let snapshot = RateSnapshot {
            micro_rate,
            valid: true,
            updated_at_ns: current_time_nanos(),
        };
        self.current.store(snapshot);
        trace!(micro_rate, "reference rate updated");
        self.fan_out(snapshot);
        Ok(())
    }

    /// Mark the feed stale (e.g. upstream disconnect) without guessing a rate.
    pub fn mark_invalid(&self) {
        let snapshot = RateSnapshot {
            micro_rate: self.current.load().micro_rate,
            valid: false,
            updated_at_ns: current_time_nanos(),
        };
        warn!("reference rate feed marked invalid");
        self.current.store(snapshot);
        self.fan_out(snapshot);
    }

    fn fan_out(&self, snapshot: RateSnapshot) {
        let listeners = self.listeners.lock().expect("reference rate listeners poisoned");
        for listener in listeners.iter() {
            listener(snapshot);
        }
    }
}
