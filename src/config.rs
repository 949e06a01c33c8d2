//! Exchange and per-symbol configuration.
//!
//! Deserializable from TOML (as the `cooprefr-bettersys` reference backend
//! loads its own settings file), with `Default` impls for tests that do not
//! care about the exact numbers. Invalid configuration is rejected eagerly
//! at construction time rather than discovered later as a runtime panic.

use crate::types::{Bps, Price, Qty};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Hedge policy for a symbol, per spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HedgePolicy {
    None,
    DeltaNeutral,
}

/// Static configuration for one tradable symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolConfig {
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
    /// Circuit-breaker deviation tiers, in basis points, level1 < level2 < level3.
    pub level1_bps: u32,
    pub level2_bps: u32,
    pub level3_bps: u32,
    /// Soft-halt durations for tier 1 and tier 2, in milliseconds.
    pub halt_t1_ms: u64,
    pub halt_t2_ms: u64,
    /// Minimum aggregate top-5-level quantity per side below which the book
    /// emits a depth-floor alert (spec §1 Non-goals: market-making
    /// algorithms are out of scope "beyond depth-floor alerts", so this
    /// narrow alerting primitive is in scope). `None` disables the alert.
    pub depth_floor_qty: Option<Qty>,
}

impl Default for SymbolConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            category: "perpetual".to_string(),
            tick_size: Price::new(100),
            min_qty: Qty::new(1),
            max_qty: Qty::new(1_000_000_000),
            initial_margin_bps: 1_000,
            maintenance_margin_bps: 500,
            maker_fee_bps: -2,
            taker_fee_bps: 5,
            hedge_policy: HedgePolicy::None,
            external_symbol: None,
            usd_multiplier: None,
            level1_bps: 300,
            level2_bps: 500,
            level3_bps: 1_000,
            halt_t1_ms: 30_000,
            halt_t2_ms: 120_000,
            depth_floor_qty: None,
        }
    }
}

/// Exchange-wide configuration: symbol catalog plus global knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub symbols: Vec<SymbolConfig>,
    pub data_dir: String,
    /// Event-ring capacity; must be a power of two.
    pub event_ring_capacity: usize,
    /// Reference-currency threshold (micro-quote) above which the hedging
    /// loop issues a hedge order.
    pub hedge_threshold_micros: u128,
    /// Maximum retained hedge-history entries per symbol.
    pub hedge_history_capacity: usize,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            data_dir: "./data".to_string(),
            event_ring_capacity: 1 << 16,
            hedge_threshold_micros: 0,
            hedge_history_capacity: 256,
        }
    }
}

/// Errors surfaced while validating configuration.
#[derive(Debug)]
#[non_exhaustive]
pub enum ConfigError {
    NonPositiveTick { symbol: String },
    NonPositiveLot { symbol: String },
    NegativeFee { symbol: String, which: &'static str },
    HedgePolicyRequiresExternalSymbol { symbol: String },
    CircuitBreakerTiersNotIncreasing { symbol: String },
    HaltDurationsNotIncreasing { symbol: String },
    RingCapacityNotPowerOfTwo { capacity: usize },
    Io(String),
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonPositiveTick { symbol } => {
                write!(f, "symbol {symbol}: tick size must be strictly positive")
            }
            ConfigError::NonPositiveLot { symbol } => {
                write!(f, "symbol {symbol}: min/max quantity must be strictly positive")
            }
            ConfigError::NegativeFee { symbol, which } => {
                write!(f, "symbol {symbol}: {which} fee must be non-negative")
            }
            ConfigError::HedgePolicyRequiresExternalSymbol { symbol } => write!(
                f,
                "symbol {symbol}: hedge policy delta-neutral requires an external symbol"
            ),
            ConfigError::CircuitBreakerTiersNotIncreasing { symbol } => write!(
                f,
                "symbol {symbol}: circuit breaker tiers must satisfy level1 < level2 < level3"
            ),
            ConfigError::HaltDurationsNotIncreasing { symbol } => {
                write!(f, "symbol {symbol}: halt_t1_ms must be < halt_t2_ms")
            }
            ConfigError::RingCapacityNotPowerOfTwo { capacity } => write!(
                f,
                "event_ring_capacity {capacity} is not a power of two"
            ),
            ConfigError::Io(msg) => write!(f, "config I/O error: {msg}"),
            ConfigError::Parse(msg) => write!(f, "config parse error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ExchangeConfig {
    /// Load configuration from a TOML file on disk.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: ExchangeConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every symbol's configuration and global invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.event_ring_capacity.is_power_of_two() {
            return Err(ConfigError::RingCapacityNotPowerOfTwo {
                capacity: self.event_ring_capacity,
            });
        }
        for symbol in &self.symbols {
            symbol.validate()?;
        }
        Ok(())
    }
}

impl SymbolConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_size.is_zero() {
            return Err(ConfigError::NonPositiveTick {
                symbol: self.name.clone(),
            });
        }
        if self.min_qty.is_zero() || self.max_qty.is_zero() || self.min_qty > self.max_qty {
            return Err(ConfigError::NonPositiveLot {
                symbol: self.name.clone(),
            });
        }
        if self.taker_fee_bps < 0 {
            return Err(ConfigError::NegativeFee {
                symbol: self.name.clone(),
                which: "taker",
            });
        }
        if self.hedge_policy == HedgePolicy::DeltaNeutral && self.external_symbol.is_none() {
            return Err(ConfigError::HedgePolicyRequiresExternalSymbol {
                symbol: self.name.clone(),
            });
        }
        if !(self.level1_bps < self.level2_bps && self.level2_bps < self.level3_bps) {
            return Err(ConfigError::CircuitBreakerTiersNotIncreasing {
                symbol: self.name.clone(),
            });
        }
        if self.halt_t1_ms >= self.halt_t2_ms {
            return Err(ConfigError::HaltDurationsNotIncreasing {
                symbol: self.name.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_symbol_config_validates() {
        let mut cfg = SymbolConfig {
            name: "BTC-PERP".to_string(),
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());

        cfg.tick_size = Price::ZERO;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonPositiveTick { .. })
        ));
    }

    #[test]
    fn hedge_policy_requires_external_symbol() {
        let cfg = SymbolConfig {
            name: "BTC-PERP".to_string(),
            hedge_policy: HedgePolicy::DeltaNeutral,
            external_symbol: None,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::HedgePolicyRequiresExternalSymbol { .. })
        ));
    }

    #[test]
    fn circuit_breaker_tiers_must_increase() {
        let cfg = SymbolConfig {
            name: "X".to_string(),
            level1_bps: 500,
            level2_bps: 300,
            level3_bps: 1000,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::CircuitBreakerTiersNotIncreasing { .. })
        ));
    }

    #[test]
    fn ring_capacity_must_be_power_of_two() {
        let cfg = ExchangeConfig {
            event_ring_capacity: 100,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RingCapacityNotPowerOfTwo { .. })
        ));
    }
}
