//! Replay equivalence (spec §4.4/§8, property 6): reading the binary log in
//! order and re-applying events to a fresh position manager must yield
//! identical balances and positions to the live system.

use super::types::JournalEvent;
use crate::accounting::{AccountingError, PositionManager};
use crate::catalog::Catalog;
use crate::types::SymbolId;

/// Re-apply one journal event to `positions`, looking up per-symbol margin
/// rates from `catalog` where needed. Trade events go through
/// [`PositionManager::apply_trade`] — the exact same call the live matching
/// path makes — so replay and live state can never structurally diverge.
pub fn apply_event(
    positions: &PositionManager,
    catalog: &Catalog,
    event: &JournalEvent,
) -> Result<(), AccountingError> {
    match event {
        JournalEvent::Deposit {
            owner_id,
            amount_micros,
            ..
        } => positions.deposit(*owner_id, *amount_micros),
        JournalEvent::Withdraw {
            owner_id,
            amount_micros,
            ..
        } => positions.withdraw(*owner_id, *amount_micros),
        JournalEvent::Trade { symbol, .. } => {
            let trade = trade_from_event(event);
            let margin_bps = initial_margin_bps_for(catalog, *symbol);
            positions.apply_trade(&trade, margin_bps);
            Ok(())
        }
        JournalEvent::Liquidation {
            owner_id,
            symbol,
            price,
            ..
        } => {
            let margin_bps = initial_margin_bps_for(catalog, *symbol);
            positions.liquidate(*owner_id, *symbol, *price, margin_bps, 0);
            Ok(())
        }
        JournalEvent::Funding {
            owner_id,
            amount_micros,
            ..
        } => positions.deposit(*owner_id, *amount_micros),
        JournalEvent::Fee {
            owner_id,
            amount_micros,
            ..
        } => positions.withdraw(*owner_id, *amount_micros),
    }
}

fn initial_margin_bps_for(catalog: &Catalog, symbol: SymbolId) -> crate::types::Bps {
    catalog.get(symbol).map(|s| s.initial_margin_bps).unwrap_or(0)
}

fn trade_from_event(event: &JournalEvent) -> crate::book::Trade {
    match event {
        JournalEvent::Trade {
            trade_id,
            symbol,
            aggressor_side,
            price,
            qty,
            maker_owner_id,
            taker_owner_id,
            maker_order_id,
            taker_order_id,
            maker_fee_micros,
            taker_fee_micros,
            ..
        } => crate::book::Trade {
            trade_id: *trade_id,
            symbol: *symbol,
            aggressor_side: *aggressor_side,
            price: *price,
            qty: *qty,
            maker_owner_id: *maker_owner_id,
            taker_owner_id: *taker_owner_id,
            maker_order_id: *maker_order_id,
            taker_order_id: *taker_order_id,
            timestamp_ns: 0,
            maker_fee_micros: *maker_fee_micros,
            taker_fee_micros: *taker_fee_micros,
        },
        _ => unreachable!("trade_from_event called on a non-trade event"),
    }
}

#[cfg(all(test, feature = "journal"))]
mod tests {
    use super::*;
    use crate::config::SymbolConfig;
    use crate::journal::file::BinaryJournal;
    use crate::journal::ring::EventRing;
    use crate::types::{OwnerId, SymbolId};

    #[test]
    fn replaying_deposits_and_a_trade_matches_live_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.bin");
        let binary = BinaryJournal::open(&path).unwrap();
        let ring = EventRing::new(16);

        let catalog = Catalog::new();
        catalog
            .register(
                SymbolId(1),
                &SymbolConfig {
                    name: "X".into(),
                    initial_margin_bps: 1_000,
                    ..Default::default()
                },
            )
            .unwrap();

        let live = PositionManager::new();
        live.deposit(OwnerId(1), 1_000_000_000).unwrap();
        live.deposit(OwnerId(2), 1_000_000_000).unwrap();

        let trade = crate::book::Trade {
            trade_id: crate::types::TradeId(1),
            symbol: SymbolId(1),
            aggressor_side: crate::types::Side::Buy,
            price: crate::types::Price::new(7_000_000),
            qty: crate::types::Qty::new(2),
            maker_owner_id: OwnerId(1),
            taker_owner_id: OwnerId(2),
            maker_order_id: crate::types::OrderId(1),
            taker_order_id: crate::types::OrderId(2),
            timestamp_ns: 5,
            maker_fee_micros: -100,
            taker_fee_micros: 200,
        };
        live.apply_trade(&trade, 1_000);

        let deposit_event_1 = JournalEvent::Deposit {
            owner_id: OwnerId(1),
            amount_micros: 1_000_000_000,
            resulting_balance_micros: 1_000_000_000,
        };
        let deposit_event_2 = JournalEvent::Deposit {
            owner_id: OwnerId(2),
            amount_micros: 1_000_000_000,
            resulting_balance_micros: 1_000_000_000,
        };
        let trade_event = JournalEvent::Trade {
            trade_id: trade.trade_id,
            symbol: trade.symbol,
            aggressor_side: trade.aggressor_side,
            price: trade.price,
            qty: trade.qty,
            maker_owner_id: trade.maker_owner_id,
            taker_owner_id: trade.taker_owner_id,
            maker_order_id: trade.maker_order_id,
            taker_order_id: trade.taker_order_id,
            maker_fee_micros: trade.maker_fee_micros,
            taker_fee_micros: trade.taker_fee_micros,
            maker_realized_pnl_micros: 0,
            taker_realized_pnl_micros: 0,
            maker_resulting_balance_micros: 0,
            taker_resulting_balance_micros: 0,
        };

        for event in [deposit_event_1, deposit_event_2, trade_event] {
            ring.publish(event);
        }
        // The ring already stamped and queued the events; drain straight
        // into the binary log exactly as the cold worker would.
        while let Some(sequenced) = ring.pop() {
            binary.append(&sequenced).unwrap();
        }

        let fresh = PositionManager::new();
        for result in binary.read_from(0).unwrap() {
            let sequenced = result.unwrap();
            apply_event(&fresh, &catalog, &sequenced.event).unwrap();
        }

        let live_maker = live.position(OwnerId(1), SymbolId(1)).unwrap();
        let replayed_maker = fresh.position(OwnerId(1), SymbolId(1)).unwrap();
        assert_eq!(live_maker.signed_size, replayed_maker.signed_size);
        assert_eq!(live_maker.entry_price, replayed_maker.entry_price);

        let live_account_1 = live.account(OwnerId(1)).unwrap();
        let replayed_account_1 = fresh.account(OwnerId(1)).unwrap();
        assert_eq!(live_account_1.free_balance, replayed_account_1.free_balance);
    }
}
