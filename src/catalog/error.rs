//! Catalog error types.

use crate::types::SymbolId;
use std::fmt;

#[derive(Debug)]
#[non_exhaustive]
pub enum CatalogError {
    /// A symbol with this id was already registered.
    AlreadyRegistered { symbol_id: SymbolId },

    /// Lookup failed: no symbol with this id is registered.
    UnknownSymbol { symbol_id: SymbolId },

    /// `hedge_policy == DeltaNeutral` was set without an `external_symbol`.
    HedgePolicyRequiresExternalSymbol { symbol_id: SymbolId },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::AlreadyRegistered { symbol_id } => {
                write!(f, "symbol {symbol_id:?} already registered")
            }
            CatalogError::UnknownSymbol { symbol_id } => {
                write!(f, "unknown symbol {symbol_id:?}")
            }
            CatalogError::HedgePolicyRequiresExternalSymbol { symbol_id } => write!(
                f,
                "symbol {symbol_id:?}: delta-neutral hedge policy requires an external symbol"
            ),
        }
    }
}

impl std::error::Error for CatalogError {}
