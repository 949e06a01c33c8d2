//! Per-symbol order book and matching engine (spec §3/§4, C3/C4).

#[allow(clippy::module_inception)]
pub mod book;
pub mod error;
pub mod level;
pub mod matching;
pub mod order;
pub mod trade;

pub use book::{AdmissionResult, OrderBook};
pub use error::BookError;
pub use order::{Order, OrderKind, OrderStatus};
pub use trade::Trade;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderId, OwnerId, Price, Qty, Side, SymbolId};

    fn book() -> OrderBook {
        OrderBook::new(SymbolId(1), Price::new(100), Qty::new(1), Qty::new(1_000_000), -2, 5)
    }

    /// S1: partial fill then resting remainder.
    #[test]
    fn partial_then_rest() {
        let b = book();
        b.submit(
            OrderId(1),
            OwnerId(1),
            Side::Sell,
            OrderKind::Limit,
            Price::new(7_000_000),
            Qty::new(5),
            None,
            1,
        )
        .unwrap();

        let result = b
            .submit(
                OrderId(2),
                OwnerId(2),
                Side::Buy,
                OrderKind::Limit,
                Price::new(7_000_000),
                Qty::new(3),
                None,
                2,
            )
            .unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.price, Price::new(7_000_000));
        assert_eq!(trade.qty, Qty::new(3));
        assert_eq!(trade.maker_owner_id, OwnerId(1));
        assert_eq!(trade.taker_owner_id, OwnerId(2));

        let maker = b.order(OrderId(1)).unwrap();
        assert_eq!(maker.status, OrderStatus::PartiallyFilled);
        assert_eq!(maker.remaining_qty, Qty::new(2));
        assert_eq!(b.best_ask(), Some(Price::new(7_000_000)));
        assert_eq!(b.best_bid(), None);
    }

    /// S2: level sweep across two price levels.
    #[test]
    fn level_sweep() {
        let b = book();
        b.submit(OrderId(1), OwnerId(1), Side::Sell, OrderKind::Limit, Price::new(7_000_000), Qty::new(2), None, 1).unwrap();
        b.submit(OrderId(2), OwnerId(2), Side::Sell, OrderKind::Limit, Price::new(7_100_000), Qty::new(4), None, 2).unwrap();

        let result = b
            .submit(OrderId(3), OwnerId(3), Side::Buy, OrderKind::Limit, Price::new(7_100_000), Qty::new(5), None, 3)
            .unwrap();

        assert_eq!(result.trades.len(), 2);
        assert_eq!(result.trades[0].price, Price::new(7_000_000));
        assert_eq!(result.trades[0].qty, Qty::new(2));
        assert_eq!(result.trades[1].price, Price::new(7_100_000));
        assert_eq!(result.trades[1].qty, Qty::new(3));
        assert_eq!(result.order.status, OrderStatus::Filled);
        assert_eq!(b.best_ask(), Some(Price::new(7_100_000)));
        assert_eq!(b.level_quantity(Side::Sell, Price::new(7_100_000)), Qty::new(1));
    }

    /// S3: price-time priority within one level.
    #[test]
    fn price_time_priority() {
        let b = book();
        b.submit(OrderId(1), OwnerId(1), Side::Sell, OrderKind::Limit, Price::new(7_000_000), Qty::new(2), None, 1).unwrap();
        b.submit(OrderId(2), OwnerId(2), Side::Sell, OrderKind::Limit, Price::new(7_000_000), Qty::new(2), None, 2).unwrap();

        let result = b
            .submit(OrderId(3), OwnerId(3), Side::Buy, OrderKind::Limit, Price::new(7_000_000), Qty::new(3), None, 3)
            .unwrap();

        assert_eq!(result.trades.len(), 2);
        assert_eq!(result.trades[0].maker_order_id, OrderId(1));
        assert_eq!(result.trades[0].qty, Qty::new(2));
        assert_eq!(result.trades[1].maker_order_id, OrderId(2));
        assert_eq!(result.trades[1].qty, Qty::new(1));
    }

    /// S4: post-only reject.
    #[test]
    fn post_only_reject() {
        let b = book();
        b.submit(OrderId(1), OwnerId(1), Side::Sell, OrderKind::Limit, Price::new(7_000_000), Qty::new(1), None, 1).unwrap();

        let err = b
            .submit(OrderId(2), OwnerId(2), Side::Buy, OrderKind::PostOnly, Price::new(7_000_000), Qty::new(1), None, 2)
            .unwrap_err();

        assert!(matches!(err, BookError::PostOnlyWouldCross { .. }));
        assert!(b.order(OrderId(2)).is_none());
        assert_eq!(b.level_quantity(Side::Sell, Price::new(7_000_000)), Qty::new(1));
    }

    /// S5: FOK unsatisfiable leaves the book untouched.
    #[test]
    fn fok_unsatisfiable_leaves_book_unchanged() {
        let b = book();
        b.submit(OrderId(1), OwnerId(1), Side::Sell, OrderKind::Limit, Price::new(7_000_000), Qty::new(1), None, 1).unwrap();

        let err = b
            .submit(OrderId(2), OwnerId(2), Side::Buy, OrderKind::Fok, Price::new(7_000_000), Qty::new(2), None, 2)
            .unwrap_err();

        assert!(matches!(err, BookError::FokUnsatisfiable { .. }));
        assert!(b.order(OrderId(2)).is_none());
        assert_eq!(b.level_quantity(Side::Sell, Price::new(7_000_000)), Qty::new(1));
    }

    #[test]
    fn market_order_with_no_liquidity_is_cancelled_not_rejected() {
        let b = book();
        let result = b
            .submit(OrderId(1), OwnerId(1), Side::Buy, OrderKind::Market, Price::ZERO, Qty::new(1), None, 1)
            .unwrap();
        assert_eq!(result.order.status, OrderStatus::Cancelled);
        assert!(result.trades.is_empty());
        assert!(b.order(OrderId(1)).is_none());
    }

    #[test]
    fn market_order_with_no_liquidity_does_not_claim_client_id() {
        let b = book();
        b.submit(OrderId(1), OwnerId(1), Side::Buy, OrderKind::Market, Price::ZERO, Qty::new(1), Some(9), 1)
            .unwrap();
        // Retrying the same client id after a zero-fill market cancel must
        // not be rejected as a duplicate: the first attempt left no trace.
        let retried = b.submit(OrderId(2), OwnerId(1), Side::Buy, OrderKind::Market, Price::ZERO, Qty::new(1), Some(9), 2);
        assert!(retried.is_ok());
    }

    #[test]
    fn ioc_with_no_fill_is_cancelled_not_rested() {
        let b = book();
        let result = b
            .submit(OrderId(1), OwnerId(1), Side::Buy, OrderKind::Ioc, Price::new(6_000_000), Qty::new(1), None, 1)
            .unwrap();
        assert_eq!(result.order.status, OrderStatus::Cancelled);
        assert_eq!(b.best_bid(), None);
    }

    #[test]
    fn cancel_removes_resting_order() {
        let b = book();
        b.submit(OrderId(1), OwnerId(1), Side::Buy, OrderKind::Limit, Price::new(7_000_000), Qty::new(2), None, 1).unwrap();
        let cancelled = b.cancel(OrderId(1)).unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(b.best_bid(), None);
        assert!(matches!(b.cancel(OrderId(1)), Err(BookError::AlreadyTerminal { .. })));
    }

    #[test]
    fn duplicate_client_id_from_same_owner_is_rejected() {
        let b = book();
        b.submit(OrderId(1), OwnerId(1), Side::Buy, OrderKind::Limit, Price::new(7_000_000), Qty::new(1), Some(42), 1)
            .unwrap();
        let err = b
            .submit(OrderId(2), OwnerId(1), Side::Buy, OrderKind::Limit, Price::new(7_000_000), Qty::new(1), Some(42), 2)
            .unwrap_err();
        assert!(matches!(err, BookError::DuplicateClientId { .. }));
        // A different owner may reuse the same client id value.
        b.submit(OrderId(3), OwnerId(2), Side::Buy, OrderKind::Limit, Price::new(7_000_000), Qty::new(1), Some(42), 3)
            .unwrap();
    }

    #[test]
    fn rejected_order_does_not_claim_its_client_id() {
        let b = book();
        b.submit(OrderId(1), OwnerId(1), Side::Sell, OrderKind::Limit, Price::new(7_000_000), Qty::new(1), None, 1).unwrap();
        let err = b
            .submit(OrderId(2), OwnerId(2), Side::Buy, OrderKind::Fok, Price::new(7_000_000), Qty::new(2), Some(7), 2)
            .unwrap_err();
        assert!(matches!(err, BookError::FokUnsatisfiable { .. }));
        // Retrying with the same client id now succeeds since the rejected
        // attempt left no trace.
        b.submit(OrderId(3), OwnerId(2), Side::Buy, OrderKind::Limit, Price::new(7_000_000), Qty::new(1), Some(7), 3)
            .unwrap();
    }
}
