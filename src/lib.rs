//! # perp-core
//!
//! Matching, accounting, and hedging core for a cash-settled perpetual
//! futures exchange trading against a single quote currency.
//!
//! ## Architecture
//!
//! - [`catalog`] — symbol metadata: tick/lot size, margin and fee schedule,
//!   mark price, hedge policy (C1).
//! - [`reference_rate`] — external reference-rate feed with a validity flag,
//!   fanned out to subscribers (C2).
//! - [`book`] — per-symbol price-time-priority order book and matching
//!   engine: limit, market, IOC, FOK, and post-only admission (C3/C4).
//! - [`accounting`] — per-owner positions, balances, margin, and realized/
//!   unrealized P&L, plus aggregate net exposure per symbol (C5).
//! - [`journal`] — the dual-speed event journal: a wait-free hot-path ring,
//!   a durable CRC-checked binary log, a human-readable double-entry text
//!   journal, and offline replay (C6).
//! - [`market`] — reference-rate-anchored price bands and tiered circuit
//!   breakers (C7).
//! - [`hedging`] and [`venue`] — the delta-neutral hedging loop and the
//!   narrow external-venue adapter contract it drives (C8/C9).
//! - [`readmodel`] — the write-side read-model projection contract (C10).
//! - [`exchange`] — the composition root: one `Exchange` value wiring every
//!   component together behind per-symbol serialized regions.
//!
//! Money and quantities are scaled integers throughout ([`types`]); there is
//! no floating-point arithmetic on the matching or accounting path.

pub mod accounting;
pub mod book;
pub mod catalog;
pub mod config;
pub mod exchange;
pub mod hedging;
pub mod journal;
pub mod market;
pub mod prelude;
pub mod readmodel;
pub mod reference_rate;
pub mod types;
mod utils;
pub mod venue;

pub use exchange::{Exchange, ExchangeError};
