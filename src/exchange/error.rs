//! Composition-root error type: a thin wrapper over each component's own
//! error so callers at the `Exchange` boundary have one type to match on.

use crate::accounting::AccountingError;
use crate::book::BookError;
use crate::catalog::CatalogError;
use crate::market::MarketError;
use crate::types::{OwnerId, SymbolId};
use std::fmt;

#[derive(Debug)]
#[non_exhaustive]
pub enum ExchangeError {
    UnknownSymbol { symbol_id: SymbolId },
    /// Admission was attempted against a symbol `Catalog::set_active(false)`
    /// has taken out of trading (spec §4.2 fail modes, §5 validation
    /// taxonomy: a distinct reason code from `UnknownSymbol`).
    InactiveSymbol { symbol_id: SymbolId },
    Market(MarketError),
    Book(BookError),
    Accounting(AccountingError),
    Catalog(CatalogError),
    /// The symbol's region worker has shut down or its channel disconnected.
    RegionUnavailable { symbol_id: SymbolId },
    /// `liquidate` was called but the position's margin level is still at or
    /// above the symbol's maintenance-margin threshold.
    NotLiquidatable { owner_id: OwnerId, symbol_id: SymbolId },
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeError::UnknownSymbol { symbol_id } => write!(f, "unknown symbol {symbol_id:?}"),
            ExchangeError::InactiveSymbol { symbol_id } => write!(f, "symbol {symbol_id:?} is not active"),
            ExchangeError::Market(e) => write!(f, "{e}"),
            ExchangeError::Book(e) => write!(f, "{e}"),
            ExchangeError::Accounting(e) => write!(f, "{e}"),
            ExchangeError::Catalog(e) => write!(f, "{e}"),
            ExchangeError::RegionUnavailable { symbol_id } => {
                write!(f, "symbol {symbol_id:?}'s region is no longer accepting commands")
            }
            ExchangeError::NotLiquidatable { owner_id, symbol_id } => {
                write!(f, "owner {owner_id:?}'s position in {symbol_id:?} is above the maintenance-margin threshold")
            }
        }
    }
}

impl std::error::Error for ExchangeError {}

impl From<MarketError> for ExchangeError {
    fn from(e: MarketError) -> Self {
        ExchangeError::Market(e)
    }
}

impl From<BookError> for ExchangeError {
    fn from(e: BookError) -> Self {
        ExchangeError::Book(e)
    }
}

impl From<AccountingError> for ExchangeError {
    fn from(e: AccountingError) -> Self {
        ExchangeError::Accounting(e)
    }
}

impl From<CatalogError> for ExchangeError {
    fn from(e: CatalogError) -> Self {
        ExchangeError::Catalog(e)
    }
}
