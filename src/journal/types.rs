//! Event and command types for the accounting journal (spec §3/§4.4, C6).

use crate::types::{OrderId, OwnerId, Price, Qty, SignedMicros, Side, SymbolId, TradeId};
use serde::{Deserialize, Serialize};

/// The kind of state-changing event recorded in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Deposit,
    Withdraw,
    Trade,
    Liquidation,
    Funding,
    Fee,
}

/// One state-changing event, carrying everything needed to reconstruct the
/// post-state without consulting anything else (spec §3, Event invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JournalEvent {
    Deposit {
        owner_id: OwnerId,
        amount_micros: SignedMicros,
        resulting_balance_micros: SignedMicros,
    },
    Withdraw {
        owner_id: OwnerId,
        amount_micros: SignedMicros,
        resulting_balance_micros: SignedMicros,
    },
    Trade {
        trade_id: TradeId,
        symbol: SymbolId,
        aggressor_side: Side,
        price: Price,
        qty: Qty,
        maker_owner_id: OwnerId,
        taker_owner_id: OwnerId,
        maker_order_id: OrderId,
        taker_order_id: OrderId,
        maker_fee_micros: SignedMicros,
        taker_fee_micros: SignedMicros,
        maker_realized_pnl_micros: SignedMicros,
        taker_realized_pnl_micros: SignedMicros,
        maker_resulting_balance_micros: SignedMicros,
        taker_resulting_balance_micros: SignedMicros,
    },
    Liquidation {
        owner_id: OwnerId,
        symbol: SymbolId,
        qty: Qty,
        price: Price,
        realized_pnl_micros: SignedMicros,
        resulting_balance_micros: SignedMicros,
    },
    Funding {
        owner_id: OwnerId,
        symbol: SymbolId,
        amount_micros: SignedMicros,
        resulting_balance_micros: SignedMicros,
    },
    Fee {
        owner_id: OwnerId,
        symbol: Option<SymbolId>,
        amount_micros: SignedMicros,
        resulting_balance_micros: SignedMicros,
    },
}

impl JournalEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            JournalEvent::Deposit { .. } => EventKind::Deposit,
            JournalEvent::Withdraw { .. } => EventKind::Withdraw,
            JournalEvent::Trade { .. } => EventKind::Trade,
            JournalEvent::Liquidation { .. } => EventKind::Liquidation,
            JournalEvent::Funding { .. } => EventKind::Funding,
            JournalEvent::Fee { .. } => EventKind::Fee,
        }
    }
}

/// A [`JournalEvent`] stamped with the sequencer's monotonic, gap-free
/// sequence number and a wall-clock timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencedEvent {
    pub sequence: u64,
    pub timestamp_ns: u64,
    pub event: JournalEvent,
}
