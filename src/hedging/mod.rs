//! Delta-neutral hedging loop (C8, spec §4.6).
//!
//! A named worker (Design Notes: background sleep loops become explicit
//! named workers with a tick cadence) that reconciles each hedgeable
//! symbol's net internal exposure ([`crate::accounting::PositionManager`])
//! against the external venue's reported holding ([`crate::venue::ExternalVenue`]),
//! issuing a hedge order when the gap exceeds a configured reference-unit
//! threshold.

use crate::accounting::PositionManager;
use crate::catalog::Catalog;
use crate::config::HedgePolicy;
use crate::reference_rate::ReferenceRateFeed;
use crate::types::SymbolId;
use crate::venue::{ExternalVenue, HedgeExecutionOutcome};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HedgeStatus {
    Filled,
    Failed,
}

#[derive(Debug, Clone, Copy)]
pub struct HedgeRecord {
    pub symbol: SymbolId,
    pub signed_qty: i64,
    pub status: HedgeStatus,
    pub issued_ts_ns: u64,
}

pub struct HedgingLoop {
    positions: Arc<PositionManager>,
    catalog: Arc<Catalog>,
    reference_rate: Arc<ReferenceRateFeed>,
    venue: Arc<dyn ExternalVenue>,
    /// The core's belief of the external holding per symbol. Updated
    /// optimistically when a hedge order is *sent*, not when it is
    /// acknowledged, then rolled back if the send turns out to have
    /// failed — this crate's resolution of the open question in spec
    /// §9/DESIGN.md, chosen so a failed hedge cannot permanently diverge
    /// the mirror from what the venue actually holds.
    mirror: DashMap<SymbolId, AtomicI64>,
    history: DashMap<SymbolId, Mutex<VecDeque<HedgeRecord>>>,
    threshold_reference_micros: u128,
    history_capacity: usize,
}

impl HedgingLoop {
    #[must_use]
    pub fn new(
        positions: Arc<PositionManager>,
        catalog: Arc<Catalog>,
        reference_rate: Arc<ReferenceRateFeed>,
        venue: Arc<dyn ExternalVenue>,
        threshold_reference_micros: u128,
        history_capacity: usize,
    ) -> Self {
        Self {
            positions,
            catalog,
            reference_rate,
            venue,
            mirror: DashMap::new(),
            history: DashMap::new(),
            threshold_reference_micros,
            history_capacity,
        }
    }

    fn mirrored_external(&self, symbol_id: SymbolId) -> i64 {
        self.venue
            .external_holding(symbol_id)
            .unwrap_or_else(|| self.mirror.get(&symbol_id).map(|v| v.load(Ordering::SeqCst)).unwrap_or(0))
    }

    /// Run one reconciliation pass over every delta-neutral symbol.
    /// Returns the number of hedge orders issued this tick.
    pub fn tick(&self, now_ns: u64) -> usize {
        let mut issued = 0;
        for symbol in self.catalog.all_active() {
            if symbol.hedge_policy != HedgePolicy::DeltaNeutral {
                continue;
            }
            let net_internal = self.positions.net_exposure(symbol.id);
            let external = self.mirrored_external(symbol.id);
            let unhedged = net_internal - external;
            if unhedged == 0 {
                continue;
            }

            let rate = self.reference_rate.current();
            if !rate.valid || rate.micro_rate <= 0 {
                warn!(symbol_id = symbol.id.0, "hedging loop: reference rate invalid, skipping tick");
                continue;
            }

            let usd_multiplier = symbol.usd_multiplier.unwrap_or(1) as i128;
            let exposure_reference_micros = (unhedged.unsigned_abs() as i128)
                .saturating_mul(symbol.mark_price.0 as i128)
                .saturating_mul(usd_multiplier)
                / rate.micro_rate;

            if (exposure_reference_micros as u128) <= self.threshold_reference_micros {
                trace!(symbol_id = symbol.id.0, unhedged, "hedging loop: within threshold");
                continue;
            }

            self.mirror
                .entry(symbol.id)
                .or_insert_with(|| AtomicI64::new(external))
                .store(external + unhedged, Ordering::SeqCst);

            let outcome = self.venue.execute_hedge(symbol.id, unhedged);
            let status = match outcome {
                HedgeExecutionOutcome::Filled => HedgeStatus::Filled,
                HedgeExecutionOutcome::Failed => {
                    // Roll back the optimistic mirror update; the next tick
                    // will see the same unhedged gap and retry.
                    self.mirror
                        .entry(symbol.id)
                        .or_insert_with(|| AtomicI64::new(external))
                        .store(external, Ordering::SeqCst);
                    warn!(symbol_id = symbol.id.0, unhedged, "hedge execution failed, will retry");
                    #[cfg(feature = "metrics")]
                    metrics::counter!("perp_core_hedge_failures_total", "symbol" => symbol.id.0.to_string()).increment(1);
                    HedgeStatus::Failed
                }
            };

            self.record_history(HedgeRecord {
                symbol: symbol.id,
                signed_qty: unhedged,
                status,
                issued_ts_ns: now_ns,
            });
            issued += 1;
        }
        issued
    }

    fn record_history(&self, record: HedgeRecord) {
        let mut history = self
            .history
            .entry(record.symbol)
            .or_insert_with(|| Mutex::new(VecDeque::with_capacity(self.history_capacity)))
            .lock()
            .expect("hedge history mutex poisoned");
        if history.len() == self.history_capacity {
            history.pop_front();
        }
        history.push_back(record);
    }

    #[must_use]
    pub fn history(&self, symbol_id: SymbolId) -> Vec<HedgeRecord> {
        self.history
            .get(&symbol_id)
            .map(|h| h.lock().expect("hedge history mutex poisoned").iter().copied().collect())
            .unwrap_or_default()
    }

    /// Current unhedged exposure for `symbol_id` (spec §4.6: `net_internal
    /// - external_position`), using the venue's reported holding if
    /// available, else the mirror (degraded-hedge mode).
    #[must_use]
    pub fn unhedged(&self, symbol_id: SymbolId) -> i64 {
        self.positions.net_exposure(symbol_id) - self.mirrored_external(symbol_id)
    }
}
