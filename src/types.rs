//! Scaled-integer primitives shared across the exchange core.
//!
//! All money on the matching and accounting path is an integer count of
//! micro-units (10^-6) of the exchange's single quote currency (MNT); all
//! quantities are integer micro-lots. Basis points are plain signed integers.
//! There is no floating-point arithmetic anywhere on these paths — conversion
//! to display units happens only at the external boundary (HTTP/terminal),
//! which is out of scope for this crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One basis point = 1 / 10_000.
pub const BPS_DENOMINATOR: i128 = 10_000;

/// A price expressed in micro-quote-currency units (10^-6 MNT).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Price(pub u128);

impl Price {
    pub const ZERO: Price = Price(0);

    #[must_use]
    pub fn new(micro_quote: u128) -> Self {
        Price(micro_quote)
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A quantity expressed in micro-lots (10^-6 lot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Qty(pub u64);

impl Qty {
    pub const ZERO: Qty = Qty(0);

    #[must_use]
    pub fn new(micro_lots: u64) -> Self {
        Qty(micro_lots)
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Qty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Signed money in micro-quote units, used for P&L, balances, and fees.
pub type SignedMicros = i128;

/// Basis-point integer ratio (1 bps = 0.01%).
pub type Bps = i32;

/// Apply a basis-point ratio to a notional value, rounding toward zero.
#[must_use]
pub fn apply_bps(notional: i128, bps: Bps) -> i128 {
    notional
        .checked_mul(bps as i128)
        .map(|product| product / BPS_DENOMINATOR)
        .unwrap_or(if bps >= 0 { i128::MAX } else { i128::MIN })
}

/// Unique, process-wide monotonic identifier for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

/// Unique identifier for an account owner (user).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub u64);

/// Monotonic order identifier, unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "order-{}", self.0)
    }
}

/// Monotonic trade (fill) identifier, unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TradeId(pub u64);

/// Which side of the book an order or position sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    #[must_use]
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// +1 for Buy, -1 for Sell — the sign convention used for signed position
    /// sizes throughout the accounting path.
    #[must_use]
    pub fn sign(self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}
