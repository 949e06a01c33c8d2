//! Symbol metadata (spec §3, C1).

use crate::config::{HedgePolicy, SymbolConfig};
use crate::types::{Bps, Price, Qty, SymbolId};

/// Static and slowly-varying metadata for one tradable symbol.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub category: String,
    pub tick_size: Price,
    pub min_qty: Qty,
    pub max_qty: Qty,
    pub initial_margin_bps: Bps,
    pub maintenance_margin_bps: Bps,
    pub maker_fee_bps: Bps,
    pub taker_fee_bps: Bps,
    pub hedge_policy: HedgePolicy,
    pub external_symbol: Option<String>,
    pub usd_multiplier: Option<u64>,
    pub mark_price: Price,
    pub active: bool,
    pub level1_bps: u32,
    pub level2_bps: u32,
    pub level3_bps: u32,
    pub halt_t1_ms: u64,
    pub halt_t2_ms: u64,
    pub depth_floor_qty: Option<Qty>,
}

impl Symbol {
    #[must_use]
    pub fn from_config(id: SymbolId, config: &SymbolConfig) -> Self {
        Self {
            id,
            name: config.name.clone(),
            category: config.category.clone(),
            tick_size: config.tick_size,
            min_qty: config.min_qty,
            max_qty: config.max_qty,
            initial_margin_bps: config.initial_margin_bps,
            maintenance_margin_bps: config.maintenance_margin_bps,
            maker_fee_bps: config.maker_fee_bps,
            taker_fee_bps: config.taker_fee_bps,
            hedge_policy: config.hedge_policy,
            external_symbol: config.external_symbol.clone(),
            usd_multiplier: config.usd_multiplier,
            mark_price: Price::ZERO,
            active: true,
            level1_bps: config.level1_bps,
            level2_bps: config.level2_bps,
            level3_bps: config.level3_bps,
            halt_t1_ms: config.halt_t1_ms,
            halt_t2_ms: config.halt_t2_ms,
            depth_floor_qty: config.depth_floor_qty,
        }
    }

    /// This symbol's circuit-breaker tiers and halt durations, as consumed
    /// by [`crate::market::MarketController::on_anchor_update`].
    #[must_use]
    pub fn breaker_config(&self) -> crate::market::BreakerConfig {
        crate::market::BreakerConfig {
            level1_bps: self.level1_bps,
            level2_bps: self.level2_bps,
            level3_bps: self.level3_bps,
            halt_t1_ms: self.halt_t1_ms,
            halt_t2_ms: self.halt_t2_ms,
        }
    }

    /// Round `price` down to the nearest multiple of the symbol's tick size.
    #[must_use]
    pub fn round_to_tick(&self, price: Price) -> Price {
        if self.tick_size.is_zero() {
            return price;
        }
        Price::new((price.0 / self.tick_size.0) * self.tick_size.0)
    }

    #[must_use]
    pub fn is_valid_tick(&self, price: Price) -> bool {
        self.tick_size.is_zero() || price.0 % self.tick_size.0 == 0
    }

    #[must_use]
    pub fn is_valid_quantity(&self, qty: Qty) -> bool {
        qty.0 >= self.min_qty.0 && qty.0 <= self.max_qty.0
    }
}
