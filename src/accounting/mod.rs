//! Position manager (C5): per-user positions, balances, margin,
//! realized/unrealized P&L, aggregate exposure.
//!
//! Grounded on the FIFO-ledger invariant-enforcement style of
//! `other_examples/…Hartman25…ledger.rs.rs` (validate before mutating,
//! never leave state half-applied) and the per-symbol atomic exposure
//! tracking of `other_examples/…shrivenQ…risk.rs.rs` (`DashMap` of
//! per-symbol atomics for lock-free aggregate reads).

pub mod account;
pub mod error;
pub mod position;

pub use account::Account;
pub use error::AccountingError;
pub use position::{FillOutcome, Position, apply_fill_to_position};

use crate::types::{Bps, OwnerId, Price, Qty, SignedMicros, Side, SymbolId, apply_bps};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{info, trace, warn};

#[derive(Debug, Default)]
pub struct PositionManager {
    accounts: DashMap<OwnerId, Account>,
    positions: DashMap<(OwnerId, SymbolId), Position>,
    /// Per-symbol aggregate net position across all owners, maintained
    /// incrementally so reads never need to scan `positions`.
    net_exposure: DashMap<SymbolId, AtomicI64>,
}

impl PositionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an owner's free balance. Creates the account if it does not
    /// yet exist.
    pub fn deposit(&self, owner_id: OwnerId, amount: SignedMicros) -> Result<(), AccountingError> {
        let mut account = self
            .accounts
            .entry(owner_id)
            .or_insert_with(|| Account::new(owner_id));
        account.free_balance += amount;
        trace!(owner_id = owner_id.0, amount, "deposit applied");
        Ok(())
    }

    /// Debit an owner's free balance; fails rather than taking it negative.
    pub fn withdraw(&self, owner_id: OwnerId, amount: SignedMicros) -> Result<(), AccountingError> {
        let mut account = self
            .accounts
            .get_mut(&owner_id)
            .ok_or(AccountingError::UnknownOwner { owner_id })?;
        if account.free_balance < amount {
            return Err(AccountingError::InsufficientFreeBalance {
                owner_id,
                requested: amount,
                available: account.free_balance,
            });
        }
        account.free_balance -= amount;
        trace!(owner_id = owner_id.0, amount, "withdrawal applied");
        Ok(())
    }

    #[must_use]
    pub fn account(&self, owner_id: OwnerId) -> Option<Account> {
        self.accounts.get(&owner_id).map(|entry| entry.clone())
    }

    #[must_use]
    pub fn position(&self, owner_id: OwnerId, symbol: SymbolId) -> Option<Position> {
        self.positions.get(&(owner_id, symbol)).map(|entry| entry.clone())
    }

    /// Admission-time affordability gate (spec §4.2/§4.3: C4 calls into C5
    /// to validate margin before an order is allowed to rest or match).
    ///
    /// This does not move any balance — it only asks whether `free_balance`
    /// could cover the *incremental* margin this order would add in the
    /// worst case (the position's current size growing by the order's full
    /// quantity on `side`). The actual reservation happens when fills land,
    /// via [`Self::apply_fill`]'s margin true-up. See DESIGN.md for why this
    /// crate resolves the "reserve on admission vs. true-up on fill"
    /// ambiguity this way: a resting, unfilled order does not yet hold a
    /// separate margin block, only the filled exposure does.
    pub fn check_margin_available(
        &self,
        owner_id: OwnerId,
        symbol: SymbolId,
        side: Side,
        qty: Qty,
        price: Price,
        initial_margin_bps: Bps,
    ) -> Result<(), AccountingError> {
        let free_balance = self
            .accounts
            .get(&owner_id)
            .map(|a| a.free_balance)
            .unwrap_or(0);
        let position = self.position(owner_id, symbol);
        let current_signed = position.as_ref().map(|p| p.signed_size).unwrap_or(0);
        let already_reserved = position.as_ref().map(|p| p.margin_reserved).unwrap_or(0);

        let worst_case_signed = current_signed + side.sign() * qty.0 as i64;
        let worst_case_abs = worst_case_signed.unsigned_abs().max(current_signed.unsigned_abs());
        let required_total = apply_bps(worst_case_abs as i128 * price.0 as i128, initial_margin_bps);
        let incremental = (required_total - already_reserved).max(0);

        if free_balance < incremental {
            return Err(AccountingError::InsufficientMargin {
                owner_id,
                symbol,
                required: incremental,
                available: free_balance,
            });
        }
        Ok(())
    }

    /// Fold one fill into the owner's position: realize P&L on any
    /// reduction/flip, debit the fee, and true up reserved margin against
    /// the symbol's initial-margin ratio. Returns the realized P&L delta.
    ///
    /// Fees are always debited from free balance, independent of whether
    /// the fill increases or reduces the position (see DESIGN.md).
    ///
    /// A fill a match has already consummated can never be rejected here:
    /// the book and the trade record are already final by the time this is
    /// called, so there is nothing left to roll back (spec §4.3: "partial
    /// failures cannot occur" within a region step). `check_margin_available`
    /// is the only gate that may refuse an order, and it runs at admission,
    /// before any match happens. If an owner's free balance was drained
    /// after admission (e.g. a withdrawal racing a resting order's fill),
    /// the margin shortfall is absorbed: `free_balance` is allowed to go
    /// negative rather than leaving the position's reserved margin
    /// understated, which would violate the margin-monotonicity invariant
    /// (spec §8 property 4) instead.
    pub fn apply_fill(
        &self,
        owner_id: OwnerId,
        symbol: SymbolId,
        side: Side,
        qty: Qty,
        price: Price,
        fee_micros: SignedMicros,
        initial_margin_bps: Bps,
        now_ns: u64,
    ) -> SignedMicros {
        self.accounts
            .entry(owner_id)
            .or_insert_with(|| Account::new(owner_id));

        let key = (owner_id, symbol);
        let current_position = self
            .positions
            .get(&key)
            .map(|entry| entry.clone())
            .unwrap_or_else(|| Position::flat(owner_id, symbol));
        let old_margin = current_position.margin_reserved;
        let old_signed = current_position.signed_size;

        let outcome = apply_fill_to_position(current_position, side, qty.0, price, now_ns);
        let mut new_position = outcome.position;
        let required_margin = apply_bps(
            new_position.signed_size.unsigned_abs() as i128 * new_position.entry_price.0 as i128,
            initial_margin_bps,
        );
        new_position.margin_reserved = required_margin;
        let margin_delta = required_margin - old_margin;

        let mut account = self
            .accounts
            .get_mut(&owner_id)
            .expect("account entry created above");
        let available_before_margin = account.free_balance + outcome.realized_pnl_delta - fee_micros;
        let new_free = available_before_margin - margin_delta;
        if new_free < 0 {
            warn!(
                owner_id = owner_id.0,
                symbol = symbol.0,
                deficit = -new_free,
                "fill margin shortfall socialized: free balance driven negative by a consummated fill"
            );
            #[cfg(feature = "metrics")]
            metrics::counter!(
                "perp_core_margin_shortfall_total",
                "symbol" => symbol.0.to_string(),
            )
            .increment(1);
        }
        account.free_balance = new_free;
        account.reserved_margin += margin_delta;
        drop(account);

        let exposure_delta = new_position.signed_size - old_signed;
        self.adjust_exposure(symbol, exposure_delta);

        if new_position.is_flat() {
            self.positions.remove(&key);
        } else {
            self.positions.insert(key, new_position);
        }

        outcome.realized_pnl_delta
    }

    /// Apply both legs of a single trade (maker reduces/opens on one side,
    /// taker on the other) against the position manager. This is the one
    /// code path the live matching engine and the journal's offline replay
    /// both call, so replaying the same trade sequence against a fresh
    /// `PositionManager` is guaranteed to reach the same state (spec §4.4,
    /// replay equivalence).
    ///
    /// Returns `(maker_realized_pnl_delta, taker_realized_pnl_delta)`.
    ///
    /// Both legs are applied unconditionally: the trade is already final by
    /// the time this is called, so there is no failure mode left for this
    /// function to report (see `apply_fill`).
    pub fn apply_trade(&self, trade: &crate::book::Trade, initial_margin_bps: Bps) -> (SignedMicros, SignedMicros) {
        let maker_side = trade.aggressor_side.opposite();
        let maker_pnl = self.apply_fill(
            trade.maker_owner_id,
            trade.symbol,
            maker_side,
            trade.qty,
            trade.price,
            trade.maker_fee_micros,
            initial_margin_bps,
            trade.timestamp_ns,
        );
        let taker_pnl = self.apply_fill(
            trade.taker_owner_id,
            trade.symbol,
            trade.aggressor_side,
            trade.qty,
            trade.price,
            trade.taker_fee_micros,
            initial_margin_bps,
            trade.timestamp_ns,
        );
        (maker_pnl, taker_pnl)
    }

    /// Recompute unrealized P&L for every open position in `symbol` against
    /// the given mark price.
    pub fn mark_to_market(&self, symbol: SymbolId, mark_price: Price) {
        for mut entry in self.positions.iter_mut() {
            if entry.symbol == symbol {
                entry.mark_to_market(mark_price);
            }
        }
    }

    /// True when `owner_id`'s position in `symbol` has fallen below the
    /// maintenance-margin threshold at `mark_price` (spec §4.3: the trigger
    /// condition for `liquidate`). Margin level is the position's reserved
    /// margin plus its unrealized P&L at `mark_price`; a flat or
    /// non-existent position is never liquidatable.
    #[must_use]
    pub fn is_below_maintenance_margin(
        &self,
        owner_id: OwnerId,
        symbol: SymbolId,
        mark_price: Price,
        maintenance_margin_bps: Bps,
    ) -> bool {
        let Some(position) = self.position(owner_id, symbol) else {
            return false;
        };
        if position.is_flat() {
            return false;
        }
        let notional = position.signed_size.unsigned_abs() as i128 * mark_price.0 as i128;
        let maintenance_required = apply_bps(notional, maintenance_margin_bps);
        let margin_level = position.margin_reserved + position.unrealized_pnl_at(mark_price);
        margin_level < maintenance_required
    }

    /// Force-close an owner's entire position at `liquidation_price`,
    /// releasing all reserved margin. Built on top of `apply_fill` — a full
    /// opposite-side fill for the whole position size naturally drives it
    /// back to flat. Like `apply_fill`, this never fails: the caller
    /// (`Exchange::liquidate`) has already decided the liquidation must
    /// happen, so there is nothing left to reject here.
    pub fn liquidate(
        &self,
        owner_id: OwnerId,
        symbol: SymbolId,
        liquidation_price: Price,
        initial_margin_bps: Bps,
        now_ns: u64,
    ) -> SignedMicros {
        let Some(position) = self.position(owner_id, symbol) else {
            return 0;
        };
        if position.is_flat() {
            return 0;
        }
        let closing_side = if position.signed_size > 0 {
            Side::Sell
        } else {
            Side::Buy
        };
        let qty = Qty::new(position.signed_size.unsigned_abs());
        info!(owner_id = owner_id.0, symbol = symbol.0, qty = qty.0, "liquidating position");
        self.apply_fill(
            owner_id,
            symbol,
            closing_side,
            qty,
            liquidation_price,
            0,
            initial_margin_bps,
            now_ns,
        )
    }

    /// Net signed exposure across all owners for `symbol` (spec §3,
    /// Aggregate Exposure).
    #[must_use]
    pub fn net_exposure(&self, symbol: SymbolId) -> i64 {
        self.net_exposure
            .get(&symbol)
            .map(|entry| entry.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    fn adjust_exposure(&self, symbol: SymbolId, delta: i64) {
        self.net_exposure
            .entry(symbol)
            .or_insert_with(|| AtomicI64::new(0))
            .fetch_add(delta, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_and_withdraw_roundtrip() {
        let mgr = PositionManager::new();
        mgr.deposit(OwnerId(1), 1_000_000).unwrap();
        mgr.withdraw(OwnerId(1), 400_000).unwrap();
        assert_eq!(mgr.account(OwnerId(1)).unwrap().free_balance, 600_000);
    }

    #[test]
    fn withdraw_more_than_available_fails() {
        let mgr = PositionManager::new();
        mgr.deposit(OwnerId(1), 100).unwrap();
        let err = mgr.withdraw(OwnerId(1), 200).unwrap_err();
        assert!(matches!(err, AccountingError::InsufficientFreeBalance { .. }));
    }

    #[test]
    fn apply_fill_opens_position_and_reserves_margin() {
        let mgr = PositionManager::new();
        mgr.deposit(OwnerId(1), 1_000_000_000).unwrap();
        mgr.apply_fill(
            OwnerId(1),
            SymbolId(1),
            Side::Buy,
            Qty::new(3),
            Price::new(7_000_000),
            1_000,
            1_000,
            10,
        );

        let position = mgr.position(OwnerId(1), SymbolId(1)).unwrap();
        assert_eq!(position.signed_size, 3);
        assert_eq!(position.margin_reserved, 2_100_000);
        assert_eq!(mgr.net_exposure(SymbolId(1)), 3);

        let account = mgr.account(OwnerId(1)).unwrap();
        assert_eq!(account.reserved_margin, 2_100_000);
        assert_eq!(account.free_balance, 1_000_000_000 - 2_100_000 - 1_000);
    }

    #[test]
    fn liquidate_closes_position_and_releases_margin() {
        let mgr = PositionManager::new();
        mgr.deposit(OwnerId(1), 1_000_000_000).unwrap();
        mgr.apply_fill(OwnerId(1), SymbolId(1), Side::Buy, Qty::new(3), Price::new(7_000_000), 0, 1_000, 10);

        mgr.liquidate(OwnerId(1), SymbolId(1), Price::new(6_900_000), 1_000, 20);

        assert!(mgr.position(OwnerId(1), SymbolId(1)).is_none());
        assert_eq!(mgr.net_exposure(SymbolId(1)), 0);
        let account = mgr.account(OwnerId(1)).unwrap();
        assert_eq!(account.reserved_margin, 0);
    }

    #[test]
    fn check_margin_available_rejects_when_underfunded() {
        let mgr = PositionManager::new();
        mgr.deposit(OwnerId(1), 1_000).unwrap();
        let err = mgr
            .check_margin_available(OwnerId(1), SymbolId(1), Side::Buy, Qty::new(3), Price::new(7_000_000), 1_000)
            .unwrap_err();
        assert!(matches!(err, AccountingError::InsufficientMargin { .. }));
    }

    #[test]
    fn check_margin_available_accounts_for_existing_position() {
        let mgr = PositionManager::new();
        mgr.deposit(OwnerId(1), 1_000_000_000).unwrap();
        mgr.apply_fill(OwnerId(1), SymbolId(1), Side::Buy, Qty::new(3), Price::new(7_000_000), 0, 1_000, 10);
        // Reducing the position requires no incremental margin.
        assert!(
            mgr.check_margin_available(OwnerId(1), SymbolId(1), Side::Sell, Qty::new(1), Price::new(7_000_000), 1_000)
                .is_ok()
        );
    }

    /// `apply_fill` never rejects a consummated fill: a fill admitted past
    /// `check_margin_available` but that turns out to be underfunded (e.g.
    /// the owner withdrew in between) still applies, and the shortfall is
    /// socialized into a negative free balance rather than rolled back.
    #[test]
    fn apply_fill_socializes_margin_shortfall_instead_of_rejecting() {
        let mgr = PositionManager::new();
        mgr.deposit(OwnerId(1), 1_000).unwrap();
        mgr.apply_fill(OwnerId(1), SymbolId(1), Side::Buy, Qty::new(3), Price::new(7_000_000), 0, 1_000, 10);

        let position = mgr.position(OwnerId(1), SymbolId(1)).unwrap();
        assert_eq!(position.signed_size, 3);
        assert_eq!(position.margin_reserved, 2_100_000);

        let account = mgr.account(OwnerId(1)).unwrap();
        assert_eq!(account.reserved_margin, 2_100_000);
        assert!(account.free_balance < 0, "shortfall must be absorbed, not rejected");
    }
}
