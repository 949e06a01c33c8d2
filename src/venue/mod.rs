//! External venue adapter contract (C9, spec §4.7).
//!
//! The core only requires three things from the outside world: a cached
//! stream of external quotes, a synchronous hedge execution call, and an
//! optional query for the venue's current holding. Connection lifecycle,
//! reconnect, and transport are entirely the adapter's problem; the core
//! treats a disconnected adapter as "`execute_hedge` always fails" and
//! keeps trading in degraded-hedge mode (spec §4.7).

use crate::types::SymbolId;

/// A single external-venue quote update, as pushed by the adapter.
#[derive(Debug, Clone, Copy)]
pub struct ExternalQuote {
    pub symbol: SymbolId,
    pub bid_micros: u128,
    pub ask_micros: u128,
    pub timestamp_ns: u64,
}

/// Outcome of a hedge execution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HedgeExecutionOutcome {
    Filled,
    Failed,
}

/// Narrow contract the hedging loop (C8) consumes. Implementors own their
/// own connection lifecycle; none of that is visible here.
pub trait ExternalVenue: Send + Sync {
    /// Push the hedge order; `signed_qty` is positive to buy, negative to
    /// sell, in micro-lots. Synchronous — the hedging loop blocks on this
    /// call, bounded by the adapter's own timeout (spec §5).
    fn execute_hedge(&self, symbol: SymbolId, signed_qty: i64) -> HedgeExecutionOutcome;

    /// Current external holding for `symbol`, if the venue can report one.
    /// `None` when the venue is disconnected or has never reported.
    fn external_holding(&self, symbol: SymbolId) -> Option<i64>;

    /// Latest cached quote for `symbol`, if any has been received.
    fn latest_quote(&self, symbol: SymbolId) -> Option<ExternalQuote>;
}

/// A venue that is always disconnected: `execute_hedge` always fails,
/// holdings and quotes are never available. Used as the default when no
/// real adapter is wired up, and exercises the "degraded-hedge mode" path
/// in tests without needing a mock network.
#[derive(Debug, Default)]
pub struct DisconnectedVenue;

impl ExternalVenue for DisconnectedVenue {
    fn execute_hedge(&self, _symbol: SymbolId, _signed_qty: i64) -> HedgeExecutionOutcome {
        HedgeExecutionOutcome::Failed
    }

    fn external_holding(&self, _symbol: SymbolId) -> Option<i64> {
        None
    }

    fn latest_quote(&self, _symbol: SymbolId) -> Option<ExternalQuote> {
        None
    }
}
