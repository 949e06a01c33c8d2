//! Trade/Fill record (spec §3, C4).

use crate::types::{OrderId, OwnerId, Price, Qty, Side, SymbolId, TradeId};

/// A single fill produced by the matching engine. Price is always the
/// resting (maker) order's price.
#[derive(Debug, Clone)]
pub struct Trade {
    pub trade_id: TradeId,
    pub symbol: SymbolId,
    pub aggressor_side: Side,
    pub price: Price,
    pub qty: Qty,
    pub maker_owner_id: OwnerId,
    pub taker_owner_id: OwnerId,
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    pub timestamp_ns: u64,
    pub maker_fee_micros: i128,
    pub taker_fee_micros: i128,
}
