//! Market-controller error types.

use crate::types::{Price, SymbolId};
use std::fmt;

#[derive(Debug)]
#[non_exhaustive]
pub enum MarketError {
    UnknownSymbol { symbol_id: SymbolId },

    /// An order's limit price fell outside the symbol's current band.
    PriceOutOfRange {
        symbol_id: SymbolId,
        price: Price,
        lower_bound: Price,
        upper_bound: Price,
    },

    /// The symbol is halted (soft or closed) and rejects new orders.
    MarketHalted { symbol_id: SymbolId },

    /// A reference-rate anchor was requested for a symbol that has never
    /// received one.
    NoAnchorYet { symbol_id: SymbolId },
}

impl fmt::Display for MarketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketError::UnknownSymbol { symbol_id } => {
                write!(f, "unknown symbol {symbol_id:?}")
            }
            MarketError::PriceOutOfRange {
                symbol_id,
                price,
                lower_bound,
                upper_bound,
            } => write!(
                f,
                "symbol {symbol_id:?}: price {price} outside band [{lower_bound}, {upper_bound}]"
            ),
            MarketError::MarketHalted { symbol_id } => {
                write!(f, "symbol {symbol_id:?} is halted")
            }
            MarketError::NoAnchorYet { symbol_id } => {
                write!(f, "symbol {symbol_id:?} has no reference-rate anchor yet")
            }
        }
    }
}

impl std::error::Error for MarketError {}
