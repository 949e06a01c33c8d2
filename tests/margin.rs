//! Margin and liquidation behavior exercised end-to-end through `Exchange`
//! (spec §4.3: admission-time affordability gate vs. fill-time margin
//! true-up, and mechanical liquidation closing a position back to flat).

use perp_core::config::{ExchangeConfig, SymbolConfig};
use perp_core::prelude::*;
use perp_core::Exchange;

fn exchange_with_symbol(initial_margin_bps: Bps) -> Exchange {
    let config = ExchangeConfig {
        symbols: vec![SymbolConfig {
            name: "ETH-PERP".to_string(),
            tick_size: Price::new(1_000),
            min_qty: Qty::new(1),
            max_qty: Qty::new(1_000_000),
            initial_margin_bps,
            maintenance_margin_bps: initial_margin_bps / 2,
            maker_fee_bps: 0,
            taker_fee_bps: 0,
            ..Default::default()
        }],
        event_ring_capacity: 1024,
        ..Default::default()
    };
    Exchange::new(&config, None)
}

#[test]
fn margin_reserved_tracks_position_notional_at_entry_price() {
    let exchange = exchange_with_symbol(1_000); // 10%
    exchange.deposit(OwnerId(1), 1_000_000_000).unwrap();
    exchange.deposit(OwnerId(2), 1_000_000_000).unwrap();

    exchange
        .submit_order(SymbolId(1), OwnerId(1), Side::Sell, OrderKind::Limit, Price::new(3_000_000), Qty::new(100), None)
        .unwrap();
    exchange
        .submit_order(SymbolId(1), OwnerId(2), Side::Buy, OrderKind::Limit, Price::new(3_000_000), Qty::new(100), None)
        .unwrap();

    let taker_account = exchange.account(OwnerId(2)).unwrap();
    // notional = 100 * 3_000_000 = 300_000_000; 10% margin = 30_000_000
    assert_eq!(taker_account.reserved_margin, 30_000_000);
    assert_eq!(taker_account.free_balance, 1_000_000_000 - 30_000_000);
}

#[test]
fn growing_a_position_increases_reserved_margin_incrementally() {
    let exchange = exchange_with_symbol(1_000);
    exchange.deposit(OwnerId(1), 1_000_000_000).unwrap();
    exchange.deposit(OwnerId(2), 1_000_000_000).unwrap();

    exchange
        .submit_order(SymbolId(1), OwnerId(1), Side::Sell, OrderKind::Limit, Price::new(3_000_000), Qty::new(200), None)
        .unwrap();
    exchange
        .submit_order(SymbolId(1), OwnerId(2), Side::Buy, OrderKind::Limit, Price::new(3_000_000), Qty::new(50), None)
        .unwrap();
    let after_first = exchange.account(OwnerId(2)).unwrap().reserved_margin;

    exchange
        .submit_order(SymbolId(1), OwnerId(2), Side::Buy, OrderKind::Limit, Price::new(3_000_000), Qty::new(50), None)
        .unwrap();
    let after_second = exchange.account(OwnerId(2)).unwrap().reserved_margin;

    assert_eq!(after_first, 15_000_000); // 50 * 3_000_000 * 10%
    assert_eq!(after_second, 30_000_000); // 100 * 3_000_000 * 10%
}

#[test]
fn liquidation_is_rejected_while_margin_level_is_above_maintenance_threshold() {
    let exchange = exchange_with_symbol(1_000); // maintenance = 5%
    exchange.deposit(OwnerId(1), 1_000_000_000).unwrap();
    exchange.deposit(OwnerId(2), 1_000_000_000).unwrap();

    exchange
        .submit_order(SymbolId(1), OwnerId(1), Side::Sell, OrderKind::Limit, Price::new(3_000_000), Qty::new(100), None)
        .unwrap();
    exchange
        .submit_order(SymbolId(1), OwnerId(2), Side::Buy, OrderKind::Limit, Price::new(3_000_000), Qty::new(100), None)
        .unwrap();
    exchange.update_reference_rate(SymbolId(1), 3_000_000).unwrap();

    let err = exchange.liquidate(OwnerId(2), SymbolId(1)).unwrap_err();
    assert!(matches!(err, ExchangeError::NotLiquidatable { .. }));
    assert!(exchange.position(OwnerId(2), SymbolId(1)).is_some());
}

#[test]
fn liquidation_force_closes_position_once_margin_level_is_breached() {
    let exchange = exchange_with_symbol(1_000); // initial 10%, maintenance 5%
    exchange.deposit(OwnerId(1), 1_000_000_000).unwrap();
    // Just enough free balance to open the position; no headroom to absorb losses.
    exchange.deposit(OwnerId(2), 30_000_000).unwrap();

    exchange
        .submit_order(SymbolId(1), OwnerId(1), Side::Sell, OrderKind::Limit, Price::new(3_000_000), Qty::new(100), None)
        .unwrap();
    exchange
        .submit_order(SymbolId(1), OwnerId(2), Side::Buy, OrderKind::Limit, Price::new(3_000_000), Qty::new(100), None)
        .unwrap();
    assert!(exchange.position(OwnerId(2), SymbolId(1)).is_some());

    // Mark price drops far enough that the long's unrealized loss eats
    // through free balance and the remaining margin level falls below the
    // 5% maintenance threshold on 100 * 2_500_000 notional.
    exchange.update_reference_rate(SymbolId(1), 2_500_000).unwrap();

    exchange.liquidate(OwnerId(2), SymbolId(1)).unwrap();

    assert!(exchange.position(OwnerId(2), SymbolId(1)).is_none());
    assert_eq!(exchange.account(OwnerId(2)).unwrap().reserved_margin, 0);
    assert_eq!(exchange.net_exposure(SymbolId(1)), 0);
}

#[test]
fn liquidating_an_unknown_symbol_is_an_error() {
    let exchange = exchange_with_symbol(1_000);
    let err = exchange.liquidate(OwnerId(1), SymbolId(99)).unwrap_err();
    assert!(matches!(err, ExchangeError::UnknownSymbol { .. }));
}

#[test]
fn submitting_to_an_inactive_symbol_is_rejected_distinctly_from_unknown() {
    let exchange = exchange_with_symbol(1_000);
    exchange.deposit(OwnerId(1), 1_000_000_000).unwrap();
    exchange.catalog.set_active(SymbolId(1), false).unwrap();

    let err = exchange
        .submit_order(SymbolId(1), OwnerId(1), Side::Buy, OrderKind::Limit, Price::new(3_000_000), Qty::new(1), None)
        .unwrap_err();
    assert!(matches!(err, ExchangeError::InactiveSymbol { .. }));
}

#[test]
fn reducing_a_position_requires_no_incremental_margin() {
    let exchange = exchange_with_symbol(1_000);
    exchange.deposit(OwnerId(1), 1_000_000_000).unwrap();
    // Just enough to open the position (30_000_000 margin) plus a sliver of
    // headroom, so a reducing fill can't rely on spare free balance.
    exchange.deposit(OwnerId(2), 30_000_100).unwrap();
    exchange.deposit(OwnerId(3), 1_000_000_000).unwrap();

    exchange
        .submit_order(SymbolId(1), OwnerId(1), Side::Sell, OrderKind::Limit, Price::new(3_000_000), Qty::new(100), None)
        .unwrap();
    exchange
        .submit_order(SymbolId(1), OwnerId(2), Side::Buy, OrderKind::Limit, Price::new(3_000_000), Qty::new(100), None)
        .unwrap();
    assert_eq!(exchange.account(OwnerId(2)).unwrap().free_balance, 100);

    exchange
        .submit_order(SymbolId(1), OwnerId(3), Side::Sell, OrderKind::Limit, Price::new(3_000_000), Qty::new(100), None)
        .unwrap();
    let reduce = exchange.submit_order(
        SymbolId(1),
        OwnerId(2),
        Side::Sell,
        OrderKind::Limit,
        Price::new(3_000_000),
        Qty::new(100),
        None,
    );
    assert!(reduce.is_ok());
    assert!(exchange.position(OwnerId(2), SymbolId(1)).is_none());
}
