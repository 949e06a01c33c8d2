//! Prelude module that re-exports commonly used types and traits.
//!
//! ```rust
//! use perp_core::prelude::*;
//! ```

pub use crate::accounting::{Account, AccountingError, Position, PositionManager};
pub use crate::book::{AdmissionResult, BookError, Order, OrderBook, OrderKind, OrderStatus, Trade};
pub use crate::catalog::{Catalog, CatalogError, Symbol};
pub use crate::config::{ExchangeConfig, HedgePolicy, SymbolConfig};
pub use crate::exchange::{Exchange, ExchangeError};
pub use crate::hedging::{HedgeRecord, HedgeStatus, HedgingLoop};
pub use crate::journal::{JournalHandle, SequencedEvent};
pub use crate::market::{BreakerConfig, HaltState, MarketController, MarketError};
pub use crate::readmodel::{MemoryReadModelSink, NullReadModelSink, ReadModelSink};
pub use crate::reference_rate::{RateSnapshot, ReferenceRateFeed};
pub use crate::types::{Bps, OrderId, OwnerId, Price, Qty, SignedMicros, Side, SymbolId, TradeId};
pub use crate::venue::{DisconnectedVenue, ExternalVenue};
