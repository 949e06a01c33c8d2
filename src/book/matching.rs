//! Price-time priority matching (spec §4.2, C4).
//!
//! Mirrors the teacher crate's `matching.rs`: walk the opposite side in
//! best-first order using the skip list's natural ordering (no sort step),
//! match FIFO within each level, and batch-remove emptied levels once the
//! walk is done.

use crate::book::book::{AdmissionResult, OrderBook};
use crate::book::error::BookError;
use crate::book::order::{Order, OrderKind, OrderStatus};
use crate::book::trade::Trade;
use crate::types::{OrderId, OwnerId, Price, Qty, Side, TradeId, apply_bps};
use tracing::trace;

impl OrderBook {
    /// Submit a new order for admission: validate, match, and either rest
    /// the remainder or finalize the order as filled/cancelled/rejected.
    #[allow(clippy::too_many_arguments)]
    pub fn submit(
        &self,
        id: OrderId,
        owner_id: OwnerId,
        side: Side,
        kind: OrderKind,
        limit_price: Price,
        qty: Qty,
        client_order_id: Option<u64>,
        admission_ts_ns: u64,
    ) -> Result<AdmissionResult, BookError> {
        self.validate_static(limit_price, qty, kind)?;

        // Checked up front so a duplicate is always reported as such, but
        // only claimed once the order is known to actually admit, rest, or
        // fill: a reject (post-only-would-cross, FOK-unsatisfiable) or a
        // zero-fill market cancel leaves no trace, so the same client id
        // must remain free to retry (spec §4.2/§8 property 7 and 9/10: a
        // rejected or unfillable order's only effect is its own outcome).
        if let Some(client_order_id) = client_order_id {
            let key = (owner_id, client_order_id);
            if self.client_order_index.contains_key(&key) {
                return Err(BookError::DuplicateClientId { owner_id, client_order_id });
            }
        }

        if kind == OrderKind::PostOnly {
            let would_cross = match side {
                Side::Buy => self.best_ask().is_some_and(|ask| limit_price.0 >= ask.0),
                Side::Sell => self.best_bid().is_some_and(|bid| limit_price.0 <= bid.0),
            };
            if would_cross {
                return Err(BookError::PostOnlyWouldCross { side, price: limit_price });
            }
        }

        let price_limit = if kind == OrderKind::Market {
            None
        } else {
            Some(limit_price)
        };

        if kind == OrderKind::Fok {
            let available = self.peek_match(side, qty, price_limit);
            if available < qty.0 {
                return Err(BookError::FokUnsatisfiable {
                    requested: qty,
                    available: Qty::new(available),
                });
            }
        }

        let mut order = Order::new(
            id,
            owner_id,
            self.symbol,
            side,
            kind,
            limit_price,
            qty,
            client_order_id,
            admission_ts_ns,
        );

        #[cfg(feature = "metrics")]
        let match_start = std::time::Instant::now();

        let trades = if kind == OrderKind::PostOnly {
            Vec::new()
        } else {
            self.run_match(&mut order, price_limit)
        };

        #[cfg(feature = "metrics")]
        metrics::histogram!("perp_core_matching_latency_seconds").record(match_start.elapsed().as_secs_f64());

        let filled_qty = order.original_qty.0 - order.remaining_qty.0;

        // A market order the book cannot fill at all terminates as cancelled
        // with zero trades (spec §2/§4.2), not as a reject: the client-id
        // claim is never taken, so a retry with the same id is not treated
        // as a duplicate of an order that left no trace.
        if kind == OrderKind::Market && filled_qty == 0 {
            order.status = OrderStatus::Cancelled;
            return Ok(AdmissionResult { order, trades });
        }

        if let Some(client_order_id) = client_order_id {
            self.client_order_index.insert((owner_id, client_order_id), id);
        }

        if order.remaining_qty.is_zero() {
            // A fully filled order's life ends at admission; it is never
            // tracked in the live index (mirrors full-fill cleanup of makers).
            order.status = OrderStatus::Filled;
            return Ok(AdmissionResult { order, trades });
        }

        match kind {
            OrderKind::Limit | OrderKind::PostOnly => {
                order.status = if filled_qty > 0 {
                    OrderStatus::PartiallyFilled
                } else {
                    OrderStatus::Pending
                };
                self.rest(&order);
                self.orders.insert(order.id, order.clone());
                Ok(AdmissionResult { order, trades })
            }
            OrderKind::Market => {
                // Market orders never rest; whatever remains unfilled is
                // simply dropped rather than tracked in the live index.
                order.status = OrderStatus::PartiallyFilled;
                Ok(AdmissionResult { order, trades })
            }
            OrderKind::Ioc => {
                order.status = if filled_qty > 0 {
                    OrderStatus::PartiallyFilled
                } else {
                    OrderStatus::Cancelled
                };
                Ok(AdmissionResult { order, trades })
            }
            OrderKind::Fok => unreachable!("FOK either fully fills or is rejected before matching"),
        }
    }

    fn rest(&self, order: &Order) {
        let side_map = match order.side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        if let Some(entry) = side_map.get(&order.limit_price) {
            entry.value().push_back(order.id, order.remaining_qty);
        } else {
            let level = std::sync::Arc::new(crate::book::level::Level::new(order.limit_price));
            level.push_back(order.id, order.remaining_qty);
            side_map.insert(order.limit_price, level);
        }
        self.refresh_best_prices();
    }

    fn run_match(&self, order: &mut Order, price_limit: Option<Price>) -> Vec<Trade> {
        let mut trades = Vec::new();
        let mut empty_levels = Vec::new();

        let iter: Box<dyn Iterator<Item = _>> = match order.side {
            Side::Buy => Box::new(self.asks.iter()),
            Side::Sell => Box::new(self.bids.iter().rev()),
        };

        for entry in iter {
            if order.remaining_qty.is_zero() {
                break;
            }
            let price = *entry.key();
            if let Some(limit) = price_limit {
                let crosses = match order.side {
                    Side::Buy => price.0 > limit.0,
                    Side::Sell => price.0 < limit.0,
                };
                if crosses {
                    break;
                }
            }

            let level = entry.value();
            while order.remaining_qty.0 > 0 {
                let Some(maker_id) = level.front() else {
                    break;
                };
                let Some(mut maker) = self.orders.get_mut(&maker_id) else {
                    // Inconsistent index state should never happen; skip defensively.
                    level.pop_front();
                    continue;
                };

                let match_qty = Qty::new(order.remaining_qty.0.min(maker.remaining_qty.0));
                let notional = price.0 as i128 * match_qty.0 as i128;
                let maker_fee = apply_bps(notional, self.maker_fee_bps.load());
                let taker_fee = apply_bps(notional, self.taker_fee_bps.load());

                let trade = Trade {
                    trade_id: TradeId(self.trade_ids.next()),
                    symbol: self.symbol,
                    aggressor_side: order.side,
                    price,
                    qty: match_qty,
                    maker_owner_id: maker.owner_id,
                    taker_owner_id: order.owner_id,
                    maker_order_id: maker.id,
                    taker_order_id: order.id,
                    timestamp_ns: order.admission_ts_ns,
                    maker_fee_micros: maker_fee,
                    taker_fee_micros: taker_fee,
                };

                maker.remaining_qty = Qty::new(maker.remaining_qty.0 - match_qty.0);
                order.remaining_qty = Qty::new(order.remaining_qty.0 - match_qty.0);
                level.reduce(match_qty);
                self.record_trade_price(price);
                trace!(trade_id = trade.trade_id.0, price = price.0, qty = match_qty.0, "trade executed");

                if maker.remaining_qty.is_zero() {
                    maker.status = OrderStatus::Filled;
                    level.pop_front();
                    drop(maker);
                    self.orders.remove(&maker_id);
                } else {
                    maker.status = OrderStatus::PartiallyFilled;
                }

                trades.push(trade);
            }

            if level.is_empty() {
                empty_levels.push(price);
            }
        }

        let side_map = match order.side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        };
        for price in empty_levels {
            side_map.remove(&price);
        }
        self.refresh_best_prices();
        trades
    }

    /// Read-only walk reporting how much quantity is immediately available
    /// without mutating anything — used by fill-or-kill to decide whether
    /// to proceed before committing any side effect.
    #[must_use]
    pub fn peek_match(&self, side: Side, qty: Qty, price_limit: Option<Price>) -> u64 {
        let map = match side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        };
        if map.is_empty() {
            return 0;
        }

        let mut matched = 0u64;
        let iter: Box<dyn Iterator<Item = _>> = match side {
            Side::Buy => Box::new(map.iter()),
            Side::Sell => Box::new(map.iter().rev()),
        };

        for entry in iter {
            if matched >= qty.0 {
                break;
            }
            let price = *entry.key();
            if let Some(limit) = price_limit {
                let crosses = match side {
                    Side::Buy => price.0 > limit.0,
                    Side::Sell => price.0 < limit.0,
                };
                if crosses {
                    break;
                }
            }
            matched = matched.saturating_add(entry.value().total_remaining().0);
        }
        matched
    }
}
