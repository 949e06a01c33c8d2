//! Read-model store contract (C10, spec §4.8).
//!
//! The durable relational projection this would normally feed is out of
//! scope (spec §1 Non-goals). What the core owns is the narrow write-side
//! contract: every order admission, trade, and balance change gets offered
//! to a [`ReadModelSink`], and nothing downstream of that call is this
//! crate's concern. Mirrors the contract shape of [`crate::venue::ExternalVenue`]:
//! a trait boundary plus a no-op default and an in-memory test double.

use crate::book::Trade;
use crate::types::{OrderId, OwnerId, Price, Qty, Side, SignedMicros, SymbolId};
use std::sync::Mutex;

/// A point-in-time snapshot of an order as admitted or updated on the book.
#[derive(Debug, Clone, Copy)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub owner_id: OwnerId,
    pub symbol: SymbolId,
    pub side: Side,
    pub price: Option<Price>,
    pub qty: Qty,
    pub remaining_qty: Qty,
}

/// A balance change, as observed after a deposit, withdrawal, or fill.
#[derive(Debug, Clone, Copy)]
pub struct BalanceRecord {
    pub owner_id: OwnerId,
    pub free_balance: SignedMicros,
    pub reserved_margin: SignedMicros,
}

/// Write-side projection contract. Implementors decide durability, batching,
/// and schema; the core only guarantees it calls each method once per event.
pub trait ReadModelSink: Send + Sync {
    fn record_order(&self, order: OrderRecord);
    fn record_trade(&self, trade: &Trade);
    fn record_balance(&self, balance: BalanceRecord);
}

/// Default sink: discards everything. Used when no projection is wired up.
#[derive(Debug, Default)]
pub struct NullReadModelSink;

impl ReadModelSink for NullReadModelSink {
    fn record_order(&self, _order: OrderRecord) {}
    fn record_trade(&self, _trade: &Trade) {}
    fn record_balance(&self, _balance: BalanceRecord) {}
}

/// In-memory sink for tests: retains everything it is given, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryReadModelSink {
    orders: Mutex<Vec<OrderRecord>>,
    trades: Mutex<Vec<Trade>>,
    balances: Mutex<Vec<BalanceRecord>>,
}

impl MemoryReadModelSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn orders(&self) -> Vec<OrderRecord> {
        self.orders.lock().expect("read model orders mutex poisoned").clone()
    }

    #[must_use]
    pub fn trades(&self) -> Vec<Trade> {
        self.trades.lock().expect("read model trades mutex poisoned").clone()
    }

    #[must_use]
    pub fn balances(&self) -> Vec<BalanceRecord> {
        self.balances.lock().expect("read model balances mutex poisoned").clone()
    }
}

impl ReadModelSink for MemoryReadModelSink {
    fn record_order(&self, order: OrderRecord) {
        self.orders.lock().expect("read model orders mutex poisoned").push(order);
    }
    fn record_trade(&self, trade: &Trade) {
        self.trades.lock().expect("read model trades mutex poisoned").push(trade.clone());
    }
    fn record_balance(&self, balance: BalanceRecord) {
        self.balances.lock().expect("read model balances mutex poisoned").push(balance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sink_accepts_everything_silently() {
        let sink = NullReadModelSink;
        sink.record_order(OrderRecord {
            order_id: OrderId(1),
            owner_id: OwnerId(1),
            symbol: SymbolId(1),
            side: Side::Buy,
            price: Some(Price::new(1)),
            qty: Qty::new(1),
            remaining_qty: Qty::new(1),
        });
        sink.record_balance(BalanceRecord {
            owner_id: OwnerId(1),
            free_balance: 0,
            reserved_margin: 0,
        });
    }

    #[test]
    fn memory_sink_retains_records_in_order() {
        let sink = MemoryReadModelSink::new();
        sink.record_balance(BalanceRecord {
            owner_id: OwnerId(1),
            free_balance: 100,
            reserved_margin: 0,
        });
        sink.record_balance(BalanceRecord {
            owner_id: OwnerId(1),
            free_balance: 60,
            reserved_margin: 40,
        });
        let balances = sink.balances();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].free_balance, 100);
        assert_eq!(balances[1].free_balance, 60);
    }
}
