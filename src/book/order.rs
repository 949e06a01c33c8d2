//! Order types (spec §3, C3/C4).

use crate::types::{OrderId, OwnerId, Price, Qty, Side, SymbolId};

/// Time-in-force / matching behavior requested at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Limit,
    Market,
    /// Immediate-or-cancel: match what it can immediately, cancel the rest.
    Ioc,
    /// Fill-or-kill: match in full immediately or not at all.
    Fok,
    /// Post-only: rejected outright if it would cross the book at entry.
    PostOnly,
}

/// Lifecycle state of an order. Transitions are monotone toward a terminal
/// state (`Filled`, `Cancelled`, `Rejected`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub owner_id: OwnerId,
    pub symbol: SymbolId,
    pub side: Side,
    pub kind: OrderKind,
    /// Zero for market orders.
    pub limit_price: Price,
    pub original_qty: Qty,
    pub remaining_qty: Qty,
    pub client_order_id: Option<u64>,
    pub admission_ts_ns: u64,
    pub status: OrderStatus,
}

impl Order {
    #[must_use]
    pub fn new(
        id: OrderId,
        owner_id: OwnerId,
        symbol: SymbolId,
        side: Side,
        kind: OrderKind,
        limit_price: Price,
        qty: Qty,
        client_order_id: Option<u64>,
        admission_ts_ns: u64,
    ) -> Self {
        Self {
            id,
            owner_id,
            symbol,
            side,
            kind,
            limit_price,
            original_qty: qty,
            remaining_qty: qty,
            client_order_id,
            admission_ts_ns,
            status: OrderStatus::Pending,
        }
    }

    #[must_use]
    pub fn is_resting_eligible(&self) -> bool {
        matches!(self.kind, OrderKind::Limit | OrderKind::PostOnly)
    }
}
