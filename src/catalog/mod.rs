//! Product catalog (C1): symbol metadata, tick/lot, margin rate, fee
//! schedule, mark price, hedge policy.

mod error;
mod symbol;

pub use error::CatalogError;
pub use symbol::Symbol;

use crate::config::SymbolConfig;
use crate::types::{Price, SymbolId};
use dashmap::DashMap;
use tracing::info;

/// Registry of tradable symbols, safe for concurrent read-heavy access.
///
/// Backed by a `DashMap` rather than a single `RwLock<HashMap<_>>` so that
/// catalog reads on the hot matching path never contend with each other,
/// mirroring the teacher crate's use of `DashMap` for its order index.
#[derive(Debug, Default)]
pub struct Catalog {
    symbols: DashMap<SymbolId, Symbol>,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self {
            symbols: DashMap::new(),
        }
    }

    /// Register a new symbol. Fails if `symbol_id` is already registered or
    /// the configuration violates the hedge-policy invariant (validated
    /// again here even though `SymbolConfig::validate` already checked it,
    /// since callers may construct a `Symbol` directly).
    pub fn register(&self, id: SymbolId, config: &SymbolConfig) -> Result<(), CatalogError> {
        use crate::config::HedgePolicy;
        if config.hedge_policy == HedgePolicy::DeltaNeutral && config.external_symbol.is_none() {
            return Err(CatalogError::HedgePolicyRequiresExternalSymbol { symbol_id: id });
        }
        if self.symbols.contains_key(&id) {
            return Err(CatalogError::AlreadyRegistered { symbol_id: id });
        }
        let symbol = Symbol::from_config(id, config);
        info!(symbol_id = id.0, name = %symbol.name, "symbol registered");
        self.symbols.insert(id, symbol);
        Ok(())
    }

    /// Update a symbol's mark price, as driven by the reference-rate feed or
    /// the latest trade on its book.
    pub fn update_mark_price(&self, id: SymbolId, mark_price: Price) -> Result<(), CatalogError> {
        let mut entry = self
            .symbols
            .get_mut(&id)
            .ok_or(CatalogError::UnknownSymbol { symbol_id: id })?;
        entry.mark_price = mark_price;
        Ok(())
    }

    /// Activate or deactivate a symbol (e.g. administrative halt).
    pub fn set_active(&self, id: SymbolId, active: bool) -> Result<(), CatalogError> {
        let mut entry = self
            .symbols
            .get_mut(&id)
            .ok_or(CatalogError::UnknownSymbol { symbol_id: id })?;
        entry.active = active;
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: SymbolId) -> Option<Symbol> {
        self.symbols.get(&id).map(|entry| entry.clone())
    }

    /// Snapshot of all currently-active symbols.
    #[must_use]
    pub fn all_active(&self) -> Vec<Symbol> {
        self.symbols
            .iter()
            .filter(|entry| entry.active)
            .map(|entry| entry.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HedgePolicy;

    fn sample_config(name: &str) -> SymbolConfig {
        SymbolConfig {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn register_and_get_roundtrip() {
        let catalog = Catalog::new();
        catalog
            .register(SymbolId(1), &sample_config("BTC-PERP"))
            .unwrap();
        let symbol = catalog.get(SymbolId(1)).unwrap();
        assert_eq!(symbol.name, "BTC-PERP");
        assert!(symbol.active);
    }

    #[test]
    fn duplicate_registration_rejected() {
        let catalog = Catalog::new();
        catalog
            .register(SymbolId(1), &sample_config("BTC-PERP"))
            .unwrap();
        let err = catalog
            .register(SymbolId(1), &sample_config("BTC-PERP"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::AlreadyRegistered { .. }));
    }

    #[test]
    fn hedge_policy_without_external_symbol_rejected() {
        let catalog = Catalog::new();
        let config = SymbolConfig {
            name: "BTC-PERP".to_string(),
            hedge_policy: HedgePolicy::DeltaNeutral,
            external_symbol: None,
            ..Default::default()
        };
        let err = catalog.register(SymbolId(1), &config).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::HedgePolicyRequiresExternalSymbol { .. }
        ));
    }

    #[test]
    fn update_mark_price_and_set_active() {
        let catalog = Catalog::new();
        catalog
            .register(SymbolId(1), &sample_config("BTC-PERP"))
            .unwrap();
        catalog
            .update_mark_price(SymbolId(1), Price::new(7_000_000))
            .unwrap();
        assert_eq!(catalog.get(SymbolId(1)).unwrap().mark_price.0, 7_000_000);

        catalog.set_active(SymbolId(1), false).unwrap();
        assert!(catalog.all_active().is_empty());
    }

    #[test]
    fn unknown_symbol_lookup_errors() {
        let catalog = Catalog::new();
        let err = catalog.update_mark_price(SymbolId(99), Price::ZERO).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownSymbol { .. }));
    }
}
