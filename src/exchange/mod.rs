//! Composition root (spec §9, B.9): one `Exchange` value replacing
//! "process-wide singletons" with an explicit owned graph. Each registered
//! symbol gets its own serialized region — an `OrderBook` plus a single
//! worker thread draining a `crossbeam::channel` of commands, the "actor"
//! the Design Notes call for. Cross-symbol work runs fully in parallel;
//! within one symbol, the channel gives total ordering for free.
//!
//! Tests construct their own `Exchange`; nothing here is process-global.

pub mod error;

pub use error::ExchangeError;

use crate::accounting::PositionManager;
use crate::book::{AdmissionResult, Order, OrderBook, OrderKind};
use crate::catalog::Catalog;
use crate::config::ExchangeConfig;
use crate::hedging::HedgingLoop;
use crate::journal::{ColdJournalWorker, EventKind, JournalEvent, JournalHandle};
use crate::market::MarketController;
use crate::readmodel::{BalanceRecord, NullReadModelSink, OrderRecord, ReadModelSink};
use crate::reference_rate::ReferenceRateFeed;
use crate::types::{Bps, OrderId, OwnerId, Price, Qty, Side, SignedMicros, SymbolId};
use crate::utils::{IdGenerator, current_time_nanos};
use crate::venue::{DisconnectedVenue, ExternalVenue};
use crossbeam::channel::{self, Receiver, Sender};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{error, info};

#[allow(clippy::too_many_arguments)]
enum RegionCommand {
    Submit {
        owner_id: OwnerId,
        side: Side,
        kind: OrderKind,
        price: Price,
        qty: Qty,
        client_order_id: Option<u64>,
        reply: Sender<Result<AdmissionResult, ExchangeError>>,
    },
    Cancel {
        order_id: OrderId,
        reply: Sender<Result<Order, ExchangeError>>,
    },
    Depth {
        side: Side,
        levels: usize,
        reply: Sender<Vec<(Price, Qty)>>,
    },
    Shutdown,
}

struct Region {
    tx: Sender<RegionCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Region {
    fn send(&self, command: RegionCommand, symbol_id: SymbolId) -> Result<(), ExchangeError> {
        self.tx
            .send(command)
            .map_err(|_| ExchangeError::RegionUnavailable { symbol_id })
    }
}

/// Shared context every region worker closes over; cheap to clone (all
/// fields are reference-counted or copy).
#[derive(Clone)]
struct SharedContext {
    positions: Arc<PositionManager>,
    catalog: Arc<Catalog>,
    market: Arc<MarketController>,
    journal: JournalHandle,
    read_model: Arc<dyn ReadModelSink>,
    order_ids: Arc<IdGenerator>,
}

/// The perpetual-futures exchange core: catalog, reference rate, per-symbol
/// matching regions, position/margin accounting, the dual-speed journal,
/// market controller, and the hedging loop, composed into one value.
pub struct Exchange {
    pub catalog: Arc<Catalog>,
    pub reference_rate: Arc<ReferenceRateFeed>,
    pub positions: Arc<PositionManager>,
    pub market: Arc<MarketController>,
    pub hedging: Arc<HedgingLoop>,
    pub read_model: Arc<dyn ReadModelSink>,
    journal: JournalHandle,
    regions: dashmap::DashMap<SymbolId, Region>,
    order_ids: Arc<IdGenerator>,
}

impl Exchange {
    /// Build an `Exchange` from configuration, registering every configured
    /// symbol and spawning its region worker. `venue` defaults to a
    /// permanently-disconnected stub when the caller has no real adapter.
    #[must_use]
    pub fn new(config: &ExchangeConfig, venue: Option<Arc<dyn ExternalVenue>>) -> Self {
        let catalog = Arc::new(Catalog::new());
        let positions = Arc::new(PositionManager::new());
        let market = Arc::new(MarketController::new());
        let reference_rate = Arc::new(ReferenceRateFeed::new());
        let journal = JournalHandle::new(config.event_ring_capacity);
        let read_model: Arc<dyn ReadModelSink> = Arc::new(NullReadModelSink);
        let order_ids = Arc::new(IdGenerator::starting_at(1));
        let venue = venue.unwrap_or_else(|| Arc::new(DisconnectedVenue));

        let hedging = Arc::new(HedgingLoop::new(
            positions.clone(),
            catalog.clone(),
            reference_rate.clone(),
            venue,
            config.hedge_threshold_micros,
            config.hedge_history_capacity,
        ));

        let exchange = Self {
            catalog,
            reference_rate,
            positions,
            market,
            hedging,
            read_model,
            journal,
            regions: dashmap::DashMap::new(),
            order_ids,
        };

        for symbol_config in &config.symbols {
            let next_id = SymbolId(exchange.regions.len() as u32 + 1);
            if let Err(e) = exchange.register_symbol(next_id, symbol_config.clone()) {
                error!(error = %e, "failed to register configured symbol");
            }
        }

        exchange
    }

    /// Register a new tradable symbol: adds it to the catalog, seeds its
    /// circuit-breaker config, and spawns its serialized matching region.
    pub fn register_symbol(
        &self,
        symbol_id: SymbolId,
        config: crate::config::SymbolConfig,
    ) -> Result<(), ExchangeError> {
        self.catalog.register(symbol_id, &config)?;

        let book = OrderBook::new(
            symbol_id,
            config.tick_size,
            config.min_qty,
            config.max_qty,
            config.maker_fee_bps,
            config.taker_fee_bps,
        );
        book.set_depth_floor(config.depth_floor_qty);

        let (tx, rx) = channel::unbounded();
        let context = SharedContext {
            positions: self.positions.clone(),
            catalog: self.catalog.clone(),
            market: self.market.clone(),
            journal: self.journal.clone(),
            read_model: self.read_model.clone(),
            order_ids: self.order_ids.clone(),
        };
        let initial_margin_bps = config.initial_margin_bps;
        let worker = std::thread::Builder::new()
            .name(format!("region-{}", symbol_id.0))
            .spawn(move || run_region(symbol_id, book, rx, context, initial_margin_bps))
            .expect("failed to spawn region worker thread");

        self.regions.insert(
            symbol_id,
            Region {
                tx,
                worker: Mutex::new(Some(worker)),
            },
        );
        info!(symbol_id = symbol_id.0, "region worker started");
        Ok(())
    }

    fn region(&self, symbol_id: SymbolId) -> Result<dashmap::mapref::one::Ref<'_, SymbolId, Region>, ExchangeError> {
        self.regions
            .get(&symbol_id)
            .ok_or(ExchangeError::UnknownSymbol { symbol_id })
    }

    /// Submit a new order to `symbol_id`'s region and block for the result.
    pub fn submit_order(
        &self,
        symbol_id: SymbolId,
        owner_id: OwnerId,
        side: Side,
        kind: OrderKind,
        price: Price,
        qty: Qty,
        client_order_id: Option<u64>,
    ) -> Result<AdmissionResult, ExchangeError> {
        let (reply_tx, reply_rx) = channel::bounded(1);
        self.region(symbol_id)?.send(
            RegionCommand::Submit {
                owner_id,
                side,
                kind,
                price,
                qty,
                client_order_id,
                reply: reply_tx,
            },
            symbol_id,
        )?;
        reply_rx
            .recv()
            .map_err(|_| ExchangeError::RegionUnavailable { symbol_id })?
    }

    /// Cancel a resting order.
    pub fn cancel_order(&self, symbol_id: SymbolId, order_id: OrderId) -> Result<Order, ExchangeError> {
        let (reply_tx, reply_rx) = channel::bounded(1);
        self.region(symbol_id)?.send(RegionCommand::Cancel { order_id, reply: reply_tx }, symbol_id)?;
        reply_rx
            .recv()
            .map_err(|_| ExchangeError::RegionUnavailable { symbol_id })?
    }

    /// Top `levels` price levels on `side` for `symbol_id`.
    pub fn query_depth(&self, symbol_id: SymbolId, side: Side, levels: usize) -> Result<Vec<(Price, Qty)>, ExchangeError> {
        let (reply_tx, reply_rx) = channel::bounded(1);
        self.region(symbol_id)?.send(
            RegionCommand::Depth { side, levels, reply: reply_tx },
            symbol_id,
        )?;
        reply_rx.recv().map_err(|_| ExchangeError::RegionUnavailable { symbol_id })
    }

    #[must_use]
    pub fn position(&self, owner_id: OwnerId, symbol_id: SymbolId) -> Option<crate::accounting::Position> {
        self.positions.position(owner_id, symbol_id)
    }

    #[must_use]
    pub fn account(&self, owner_id: OwnerId) -> Option<crate::accounting::Account> {
        self.positions.account(owner_id)
    }

    #[must_use]
    pub fn net_exposure(&self, symbol_id: SymbolId) -> i64 {
        self.positions.net_exposure(symbol_id)
    }

    /// Force-close `owner_id`'s position in `symbol_id` at the symbol's
    /// current mark price, but only when its margin level has actually
    /// fallen below the symbol's maintenance-margin threshold (spec §4.3:
    /// C5.liquidate's trigger condition). Publishes a `Liquidation` journal
    /// event and records the resulting balance to the read model.
    pub fn liquidate(&self, owner_id: OwnerId, symbol_id: SymbolId) -> Result<SignedMicros, ExchangeError> {
        let symbol = self.catalog.get(symbol_id).ok_or(ExchangeError::UnknownSymbol { symbol_id })?;
        if !self.positions.is_below_maintenance_margin(owner_id, symbol_id, symbol.mark_price, symbol.maintenance_margin_bps) {
            return Err(ExchangeError::NotLiquidatable { owner_id, symbol_id });
        }

        let position = self.positions.position(owner_id, symbol_id);
        let qty = position.as_ref().map(|p| Qty::new(p.signed_size.unsigned_abs())).unwrap_or(Qty::ZERO);
        let realized_pnl = self.positions.liquidate(
            owner_id,
            symbol_id,
            symbol.mark_price,
            symbol.initial_margin_bps,
            current_time_nanos(),
        );

        let balance = self.positions.account(owner_id).map(|a| a.free_balance).unwrap_or(0);
        self.journal.publish(JournalEvent::Liquidation {
            owner_id,
            symbol: symbol_id,
            qty,
            price: symbol.mark_price,
            realized_pnl_micros: realized_pnl,
            resulting_balance_micros: balance,
        });
        self.read_model.record_balance(BalanceRecord {
            owner_id,
            free_balance: balance,
            reserved_margin: self.positions.account(owner_id).map(|a| a.reserved_margin).unwrap_or(0),
        });
        info!(owner_id = owner_id.0, symbol_id = symbol_id.0, "position liquidated");
        Ok(realized_pnl)
    }

    pub fn deposit(&self, owner_id: OwnerId, amount_micros: SignedMicros) -> Result<(), ExchangeError> {
        self.positions.deposit(owner_id, amount_micros)?;
        let balance = self.positions.account(owner_id).map(|a| a.free_balance).unwrap_or(0);
        self.journal.publish(JournalEvent::Deposit {
            owner_id,
            amount_micros,
            resulting_balance_micros: balance,
        });
        self.read_model.record_balance(BalanceRecord {
            owner_id,
            free_balance: balance,
            reserved_margin: self.positions.account(owner_id).map(|a| a.reserved_margin).unwrap_or(0),
        });
        Ok(())
    }

    pub fn withdraw(&self, owner_id: OwnerId, amount_micros: SignedMicros) -> Result<(), ExchangeError> {
        self.positions.withdraw(owner_id, amount_micros)?;
        let balance = self.positions.account(owner_id).map(|a| a.free_balance).unwrap_or(0);
        self.journal.publish(JournalEvent::Withdraw {
            owner_id,
            amount_micros,
            resulting_balance_micros: balance,
        });
        Ok(())
    }

    /// Push a new reference-rate reading through to the market controller's
    /// bands/breaker and the catalog's mark price, per symbol's breaker tiers.
    pub fn update_reference_rate(&self, symbol_id: SymbolId, micro_rate: i128) -> Result<(), ExchangeError> {
        self.reference_rate
            .update(micro_rate)
            .map_err(|_| ExchangeError::UnknownSymbol { symbol_id })?;
        let symbol = self.catalog.get(symbol_id).ok_or(ExchangeError::UnknownSymbol { symbol_id })?;
        let anchor = Price::new(micro_rate.unsigned_abs());
        self.market
            .on_anchor_update(symbol_id, anchor, symbol.breaker_config(), current_time_nanos());
        self.catalog.update_mark_price(symbol_id, anchor)?;
        Ok(())
    }

    /// Run one tick of the hedging loop.
    pub fn hedge_tick(&self) -> usize {
        self.hedging.tick(current_time_nanos())
    }

    /// Drain the journal ring into the given cold worker until empty, for a
    /// clean shutdown (spec §6).
    pub fn drain_journal<W: Write>(&self, worker: &mut ColdJournalWorker<W>) {
        worker.drain_all();
    }

    #[must_use]
    pub fn journal_handle(&self) -> JournalHandle {
        self.journal.clone()
    }

    /// Signal every region to stop accepting commands and join its worker
    /// thread. Safe to call multiple times.
    pub fn shutdown(&self) {
        for entry in self.regions.iter() {
            let _ = entry.value().tx.send(RegionCommand::Shutdown);
        }
        for entry in self.regions.iter() {
            if let Some(handle) = entry.value().worker.lock().expect("region worker mutex poisoned").take() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for Exchange {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_region(
    symbol_id: SymbolId,
    book: OrderBook,
    rx: Receiver<RegionCommand>,
    ctx: SharedContext,
    initial_margin_bps: Bps,
) {
    while let Ok(command) = rx.recv() {
        match command {
            RegionCommand::Shutdown => break,
            RegionCommand::Depth { side, levels, reply } => {
                let _ = reply.send(book.depth(side, levels));
            }
            RegionCommand::Cancel { order_id, reply } => {
                let result = book.cancel(order_id).map_err(ExchangeError::from);
                let _ = reply.send(result);
            }
            RegionCommand::Submit {
                owner_id,
                side,
                kind,
                price,
                qty,
                client_order_id,
                reply,
            } => {
                let result = handle_submit(symbol_id, &book, &ctx, initial_margin_bps, owner_id, side, kind, price, qty, client_order_id);
                let _ = reply.send(result);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_submit(
    symbol_id: SymbolId,
    book: &OrderBook,
    ctx: &SharedContext,
    initial_margin_bps: Bps,
    owner_id: OwnerId,
    side: Side,
    kind: OrderKind,
    price: Price,
    qty: Qty,
    client_order_id: Option<u64>,
) -> Result<AdmissionResult, ExchangeError> {
    let symbol = ctx.catalog.get(symbol_id).ok_or(ExchangeError::UnknownSymbol { symbol_id })?;
    if !symbol.active {
        return Err(ExchangeError::InactiveSymbol { symbol_id });
    }

    let admission_price = if kind == OrderKind::Market { None } else { Some(price) };
    ctx.market.validate_admission(symbol_id, admission_price)?;

    let margin_check_price = if kind == OrderKind::Market {
        book.last_trade_price().unwrap_or(price)
    } else {
        price
    };
    ctx.positions
        .check_margin_available(owner_id, symbol_id, side, qty, margin_check_price, initial_margin_bps)?;

    let now_ns = current_time_nanos();
    let order_id = OrderId(ctx.order_ids.next());
    let result = book.submit(order_id, owner_id, side, kind, price, qty, client_order_id, now_ns)?;

    for trade in &result.trades {
        let (maker_pnl, taker_pnl) = ctx.positions.apply_trade(trade, initial_margin_bps);
        ctx.catalog.update_mark_price(symbol_id, trade.price).ok();
        ctx.read_model.record_trade(trade);
        publish_trade_event(ctx, trade, maker_pnl, taker_pnl);
    }

    ctx.read_model.record_order(OrderRecord {
        order_id: result.order.id,
        owner_id: result.order.owner_id,
        symbol: symbol_id,
        side: result.order.side,
        price: admission_price,
        qty: result.order.original_qty,
        remaining_qty: result.order.remaining_qty,
    });

    Ok(result)
}

fn publish_trade_event(ctx: &SharedContext, trade: &crate::book::Trade, maker_pnl: SignedMicros, taker_pnl: SignedMicros) {
    let maker_balance = ctx.positions.account(trade.maker_owner_id).map(|a| a.free_balance).unwrap_or(0);
    let taker_balance = ctx.positions.account(trade.taker_owner_id).map(|a| a.free_balance).unwrap_or(0);
    let event = JournalEvent::Trade {
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
        maker_realized_pnl_micros: maker_pnl,
        taker_realized_pnl_micros: taker_pnl,
        maker_resulting_balance_micros: maker_balance,
        taker_resulting_balance_micros: taker_balance,
    };
    debug_assert_eq!(event.kind(), EventKind::Trade);
    ctx.journal.publish(event);
}
