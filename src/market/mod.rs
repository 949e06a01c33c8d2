//! Market controller (C7): reference-rate-anchored price bands and tiered
//! circuit breakers (spec §4.5).
//!
//! Grounded on the same `AtomicCell`/listener shape as
//! [`crate::reference_rate`]: `MarketController` is itself a
//! [`crate::reference_rate::ReferenceRateFeed`] subscriber, so anchor
//! updates flow into it as a one-way tick rather than a call back into the
//! feed (Design Notes: break the feed/position cyclic reference).

pub mod error;

pub use error::MarketError;

use crate::types::{Price, SymbolId};
use dashmap::DashMap;
use std::sync::Mutex;
use tracing::{info, warn};

/// Halt state machine: `Open -> SoftHalt(T1) -> Open`, `Open -> SoftHalt(T2)
/// -> Open`, `Open -> Closed` (terminal for the session).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltState {
    Open,
    SoftHalt,
    Closed,
}

/// Per-symbol circuit-breaker tiers and halt durations (spec §4.5, §6).
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    pub level1_bps: u32,
    pub level2_bps: u32,
    pub level3_bps: u32,
    pub halt_t1_ms: u64,
    pub halt_t2_ms: u64,
}

#[derive(Debug, Clone)]
struct MarketState {
    anchor: Option<Price>,
    lower_bound: Price,
    upper_bound: Price,
    halt: HaltState,
    halt_deadline_ns: Option<u64>,
}

impl MarketState {
    fn new() -> Self {
        Self {
            anchor: None,
            lower_bound: Price::ZERO,
            upper_bound: Price::ZERO,
            halt: HaltState::Open,
            halt_deadline_ns: None,
        }
    }
}

/// Per-symbol snapshot of market state, returned by read queries.
#[derive(Debug, Clone, Copy)]
pub struct MarketSnapshot {
    pub anchor: Option<Price>,
    pub lower_bound: Price,
    pub upper_bound: Price,
    pub halt: HaltState,
    pub halt_deadline_ns: Option<u64>,
}

#[derive(Debug, Default)]
pub struct MarketController {
    states: DashMap<SymbolId, Mutex<MarketState>>,
}

impl MarketController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, symbol_id: SymbolId) -> dashmap::mapref::one::RefMut<'_, SymbolId, Mutex<MarketState>> {
        self.states
            .entry(symbol_id)
            .or_insert_with(|| Mutex::new(MarketState::new()))
    }

    /// Ingest a new reference-rate anchor for `symbol_id` (spec §4.5): the
    /// deviation from the *previous* anchor is what trips the tiered
    /// circuit breaker (a sudden reference-rate move, not an individual
    /// trade print — see DESIGN.md for this resolution of the ambiguity
    /// between anchor-driven and trade-driven deviation). The band is
    /// always `anchor * (1 +/- level2)` regardless of which tier tripped.
    pub fn on_anchor_update(
        &self,
        symbol_id: SymbolId,
        new_anchor: Price,
        config: BreakerConfig,
        now_ns: u64,
    ) {
        let entry = self.entry(symbol_id);
        let mut state = entry.lock().expect("market state mutex poisoned");

        if let Some(previous) = state.anchor {
            if state.halt != HaltState::Closed {
                let deviation_bps = deviation_bps(previous, new_anchor);
                if deviation_bps >= config.level3_bps {
                    state.halt = HaltState::Closed;
                    state.halt_deadline_ns = None;
                    warn!(symbol_id = symbol_id.0, deviation_bps, "circuit breaker: symbol closed for session");
                    #[cfg(feature = "metrics")]
                    metrics::counter!("perp_core_circuit_breaker_trips_total", "symbol" => symbol_id.0.to_string(), "tier" => "3").increment(1);
                } else if deviation_bps >= config.level2_bps {
                    state.halt = HaltState::SoftHalt;
                    state.halt_deadline_ns = Some(now_ns + config.halt_t2_ms * 1_000_000);
                    warn!(symbol_id = symbol_id.0, deviation_bps, "circuit breaker: level2 soft halt");
                    #[cfg(feature = "metrics")]
                    metrics::counter!("perp_core_circuit_breaker_trips_total", "symbol" => symbol_id.0.to_string(), "tier" => "2").increment(1);
                } else if deviation_bps >= config.level1_bps {
                    state.halt = HaltState::SoftHalt;
                    state.halt_deadline_ns = Some(now_ns + config.halt_t1_ms * 1_000_000);
                    warn!(symbol_id = symbol_id.0, deviation_bps, "circuit breaker: level1 soft halt");
                    #[cfg(feature = "metrics")]
                    metrics::counter!("perp_core_circuit_breaker_trips_total", "symbol" => symbol_id.0.to_string(), "tier" => "1").increment(1);
                }
            }
        }

        state.anchor = Some(new_anchor);
        let band_bps = config.level2_bps as i128;
        state.lower_bound = Price::new(
            (new_anchor.0 as i128 * (10_000 - band_bps) / 10_000).max(0) as u128,
        );
        state.upper_bound = Price::new((new_anchor.0 as i128 * (10_000 + band_bps) / 10_000) as u128);
    }

    /// Auto-resume a soft-halted symbol whose deadline has passed and whose
    /// last observed price is back within band (spec §4.5). No-op for
    /// `Open` or `Closed` (closed is terminal for the session).
    pub fn check_halt_expiry(&self, symbol_id: SymbolId, now_ns: u64, last_price: Option<Price>) {
        let entry = self.entry(symbol_id);
        let mut state = entry.lock().expect("market state mutex poisoned");
        if state.halt != HaltState::SoftHalt {
            return;
        }
        let Some(deadline) = state.halt_deadline_ns else {
            return;
        };
        if now_ns < deadline {
            return;
        }
        let back_in_band = last_price
            .map(|p| p.0 >= state.lower_bound.0 && p.0 <= state.upper_bound.0)
            .unwrap_or(true);
        if back_in_band {
            state.halt = HaltState::Open;
            state.halt_deadline_ns = None;
            info!(symbol_id = symbol_id.0, "halt expired, symbol resumed");
        }
    }

    /// Validate an order's admission against band and halt state (spec
    /// §4.2: C7 validates price band and halt state). `price = None` for
    /// market orders, which are never subject to the band check. No band has
    /// been established yet if no reference-rate anchor has ever arrived for
    /// this symbol, so only the halt state is enforced until the first
    /// anchor update sets `lower_bound`/`upper_bound`.
    pub fn validate_admission(&self, symbol_id: SymbolId, price: Option<Price>) -> Result<(), MarketError> {
        let entry = self.entry(symbol_id);
        let state = entry.lock().expect("market state mutex poisoned");
        if state.halt != HaltState::Open {
            return Err(MarketError::MarketHalted { symbol_id });
        }
        if state.anchor.is_none() {
            return Ok(());
        }
        if let Some(price) = price {
            if price.0 < state.lower_bound.0 || price.0 > state.upper_bound.0 {
                return Err(MarketError::PriceOutOfRange {
                    symbol_id,
                    price,
                    lower_bound: state.lower_bound,
                    upper_bound: state.upper_bound,
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn snapshot(&self, symbol_id: SymbolId) -> Option<MarketSnapshot> {
        let state = self.states.get(&symbol_id)?;
        let state = state.lock().expect("market state mutex poisoned");
        Some(MarketSnapshot {
            anchor: state.anchor,
            lower_bound: state.lower_bound,
            upper_bound: state.upper_bound,
            halt: state.halt,
            halt_deadline_ns: state.halt_deadline_ns,
        })
    }
}

fn deviation_bps(previous: Price, new: Price) -> u32 {
    if previous.is_zero() {
        return 0;
    }
    let diff = (new.0 as i128 - previous.0 as i128).abs();
    ((diff * 10_000) / previous.0 as i128) as u32
}
