//! Per-symbol order book (spec §3/§4, C3). Two-sided, price-indexed,
//! price-time FIFO at each level. Invariant: best-bid < best-ask whenever
//! both sides are non-empty; no order appears on both sides.

use crate::book::error::BookError;
use crate::book::level::Level;
use crate::book::order::{Order, OrderKind, OrderStatus};
use crate::book::trade::Trade;
use crate::types::{Bps, OrderId, OwnerId, Price, Qty, Side, SymbolId};
use crate::utils::IdGenerator;
use crossbeam::atomic::AtomicCell;
use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{trace, warn};

/// Outcome of submitting an order: the trades it produced plus the order's
/// final admission-time status (a taker order that rests keeps `Pending`/
/// `PartiallyFilled`; one that fully executes or is rejected is terminal
/// or near-terminal).
#[derive(Debug)]
pub struct AdmissionResult {
    pub order: Order,
    pub trades: Vec<Trade>,
}

pub struct OrderBook {
    pub symbol: SymbolId,
    pub tick_size: Price,
    pub min_qty: Qty,
    pub max_qty: Qty,
    pub(crate) maker_fee_bps: AtomicCell<Bps>,
    pub(crate) taker_fee_bps: AtomicCell<Bps>,

    pub(crate) bids: SkipMap<Price, Arc<Level>>,
    pub(crate) asks: SkipMap<Price, Arc<Level>>,
    pub(crate) orders: DashMap<OrderId, Order>,

    /// Idempotency index for client-supplied ids (spec §3: "used for
    /// idempotency within owner"). Entries are never removed: a retried
    /// submission must be rejected as a duplicate even after the original
    /// order reached a terminal state.
    pub(crate) client_order_index: DashMap<(OwnerId, u64), OrderId>,

    best_bid: AtomicCell<Option<Price>>,
    best_ask: AtomicCell<Option<Price>>,
    last_trade_price: AtomicCell<Option<Price>>,

    /// Minimum acceptable aggregate quantity across [`DEPTH_FLOOR_LEVELS`]
    /// top levels per side; breaching it only logs and counts (spec §1:
    /// market-making algorithms are out of scope "beyond depth-floor
    /// alerts" — the alert itself is in scope).
    depth_floor_qty: AtomicCell<Option<Qty>>,

    pub(crate) trade_ids: IdGenerator,
}

/// Number of top-of-book levels summed when checking the depth floor.
const DEPTH_FLOOR_LEVELS: usize = 5;

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("symbol", &self.symbol)
            .field("best_bid", &self.best_bid.load())
            .field("best_ask", &self.best_ask.load())
            .finish_non_exhaustive()
    }
}

impl OrderBook {
    #[must_use]
    pub fn new(
        symbol: SymbolId,
        tick_size: Price,
        min_qty: Qty,
        max_qty: Qty,
        maker_fee_bps: Bps,
        taker_fee_bps: Bps,
    ) -> Self {
        Self {
            symbol,
            tick_size,
            min_qty,
            max_qty,
            maker_fee_bps: AtomicCell::new(maker_fee_bps),
            taker_fee_bps: AtomicCell::new(taker_fee_bps),
            bids: SkipMap::new(),
            asks: SkipMap::new(),
            orders: DashMap::new(),
            client_order_index: DashMap::new(),
            best_bid: AtomicCell::new(None),
            best_ask: AtomicCell::new(None),
            last_trade_price: AtomicCell::new(None),
            depth_floor_qty: AtomicCell::new(None),
            trade_ids: IdGenerator::starting_at(1),
        }
    }

    pub fn set_fee_schedule(&self, maker_fee_bps: Bps, taker_fee_bps: Bps) {
        self.maker_fee_bps.store(maker_fee_bps);
        self.taker_fee_bps.store(taker_fee_bps);
    }

    /// Configure (or disable, with `None`) the depth-floor alert threshold.
    pub fn set_depth_floor(&self, floor: Option<Qty>) {
        self.depth_floor_qty.store(floor);
    }

    /// Sum the top `DEPTH_FLOOR_LEVELS` levels' remaining quantity on `side`
    /// and, if below the configured floor, log and count an alert. Called
    /// after every book-mutating operation refreshes the BBO cache.
    fn check_depth_floor(&self, side: Side) {
        let Some(floor) = self.depth_floor_qty.load() else {
            return;
        };
        let total: u64 = self
            .depth(side, DEPTH_FLOOR_LEVELS)
            .iter()
            .map(|(_, qty)| qty.0)
            .sum();
        if total < floor.0 {
            warn!(
                symbol = self.symbol.0,
                side = ?side,
                depth = total,
                floor = floor.0,
                "book depth below configured floor"
            );
            #[cfg(feature = "metrics")]
            metrics::counter!(
                "perp_core_depth_floor_breaches_total",
                "symbol" => self.symbol.0.to_string(),
                "side" => format!("{side:?}"),
            )
            .increment(1);
        }
    }

    #[must_use]
    pub fn best_bid(&self) -> Option<Price> {
        self.best_bid.load()
    }

    #[must_use]
    pub fn best_ask(&self) -> Option<Price> {
        self.best_ask.load()
    }

    #[must_use]
    pub fn last_trade_price(&self) -> Option<Price> {
        self.last_trade_price.load()
    }

    #[must_use]
    pub fn order(&self, order_id: OrderId) -> Option<Order> {
        self.orders.get(&order_id).map(|entry| entry.clone())
    }

    #[must_use]
    pub fn level_quantity(&self, side: Side, price: Price) -> Qty {
        let side_map = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        side_map
            .get(&price)
            .map(|entry| entry.value().total_remaining())
            .unwrap_or(Qty::ZERO)
    }

    pub(crate) fn record_trade_price(&self, price: Price) {
        self.last_trade_price.store(Some(price));
    }

    pub(crate) fn refresh_best_prices(&self) {
        self.best_bid.store(self.bids.back().map(|e| *e.key()));
        self.best_ask.store(self.asks.front().map(|e| *e.key()));
        if self.depth_floor_qty.load().is_some() {
            self.check_depth_floor(Side::Buy);
            self.check_depth_floor(Side::Sell);
        }
    }

    /// Validate static order constraints (tick size, lot range) before
    /// admission proceeds to matching.
    pub(crate) fn validate_static(&self, price: Price, qty: Qty, kind: OrderKind) -> Result<(), BookError> {
        if kind != OrderKind::Market
            && !self.tick_size.is_zero()
            && price.0 % self.tick_size.0 != 0
        {
            return Err(BookError::InvalidTickSize {
                price,
                tick_size: self.tick_size,
            });
        }
        if qty.0 < self.min_qty.0 || qty.0 > self.max_qty.0 {
            return Err(BookError::OrderSizeOutOfRange {
                quantity: qty,
                min: self.min_qty,
                max: self.max_qty,
            });
        }
        Ok(())
    }

    /// Cancel a resting order. No-op error if the order is unknown or
    /// already terminal.
    pub fn cancel(&self, order_id: OrderId) -> Result<Order, BookError> {
        let mut entry = self
            .orders
            .get_mut(&order_id)
            .ok_or(BookError::OrderNotFound { order_id })?;
        if entry.status.is_terminal() {
            return Err(BookError::AlreadyTerminal { order_id });
        }
        let side_map = match entry.side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        if let Some(level_entry) = side_map.get(&entry.limit_price) {
            level_entry
                .value()
                .remove(order_id, entry.remaining_qty);
            if level_entry.value().is_empty() {
                side_map.remove(&entry.limit_price);
            }
        }
        entry.status = OrderStatus::Cancelled;
        self.refresh_best_prices();
        trace!(order_id = %order_id, "order cancelled");
        Ok(entry.clone())
    }

    #[must_use]
    pub fn owner_id(&self, order_id: OrderId) -> Option<OwnerId> {
        self.orders.get(&order_id).map(|o| o.owner_id)
    }

    /// Top `levels` price levels on `side`, best price first (spec §6: query
    /// depth).
    #[must_use]
    pub fn depth(&self, side: Side, levels: usize) -> Vec<(Price, Qty)> {
        match side {
            Side::Buy => self
                .bids
                .iter()
                .rev()
                .take(levels)
                .map(|e| (*e.key(), e.value().total_remaining()))
                .collect(),
            Side::Sell => self
                .asks
                .iter()
                .take(levels)
                .map(|e| (*e.key(), e.value().total_remaining()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::order::OrderKind;

    fn book() -> OrderBook {
        OrderBook::new(
            SymbolId(1),
            Price::new(100),
            Qty::new(1),
            Qty::new(1_000_000),
            -2,
            5,
        )
    }

    #[test]
    fn depth_floor_alert_does_not_affect_matching() {
        let book = book();
        book.set_depth_floor(Some(Qty::new(10)));

        let res = book
            .submit(
                OrderId(1),
                OwnerId(1),
                Side::Sell,
                OrderKind::Limit,
                Price::new(7_000_000),
                Qty::new(2),
                None,
                1,
            )
            .unwrap();
        assert!(res.trades.is_empty());
        assert_eq!(book.depth(Side::Sell, 5), vec![(Price::new(7_000_000), Qty::new(2))]);

        let res = book
            .submit(
                OrderId(2),
                OwnerId(2),
                Side::Buy,
                OrderKind::Limit,
                Price::new(7_000_000),
                Qty::new(2),
                None,
                2,
            )
            .unwrap();
        assert_eq!(res.trades.len(), 1);
        assert!(book.depth(Side::Sell, 5).is_empty());
    }

    #[test]
    fn depth_floor_disabled_by_default() {
        let book = book();
        book.submit(
            OrderId(1),
            OwnerId(1),
            Side::Sell,
            OrderKind::Limit,
            Price::new(7_000_000),
            Qty::new(1),
            None,
            1,
        )
        .unwrap();
        // No floor configured: refresh_best_prices must not attempt the check.
        assert_eq!(book.depth(Side::Sell, 5).len(), 1);
    }
}
