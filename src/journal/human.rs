//! Human-readable double-entry journal (spec §4.4/§6, C6).
//!
//! Every trade event expands into four plain-text lines: a position
//! debit/credit for each party and a fee line for each party, so an auditor
//! can read P&L movement without replaying the binary log.

use super::types::JournalEvent;
use std::fmt::Write as _;
use std::io::{self, Write};

/// Render one event as its human-readable double-entry lines.
#[must_use]
pub fn render(event: &JournalEvent) -> String {
    let mut out = String::new();
    match event {
        JournalEvent::Deposit {
            owner_id,
            amount_micros,
            resulting_balance_micros,
        } => {
            let _ = writeln!(
                out,
                "DEPOSIT  owner={} amount={amount_micros} balance={resulting_balance_micros}",
                owner_id.0
            );
        }
        JournalEvent::Withdraw {
            owner_id,
            amount_micros,
            resulting_balance_micros,
        } => {
            let _ = writeln!(
                out,
                "WITHDRAW owner={} amount={amount_micros} balance={resulting_balance_micros}",
                owner_id.0
            );
        }
        JournalEvent::Trade {
            trade_id,
            symbol,
            aggressor_side,
            price,
            qty,
            maker_owner_id,
            taker_owner_id,
            maker_order_id,
            taker_order_id,
            maker_fee_micros,
            taker_fee_micros,
            maker_realized_pnl_micros,
            taker_realized_pnl_micros,
            maker_resulting_balance_micros,
            taker_resulting_balance_micros,
        } => {
            let _ = writeln!(
                out,
                "TRADE    id={} symbol={} aggressor={aggressor_side} price={price} qty={qty}",
                trade_id.0, symbol.0
            );
            let _ = writeln!(
                out,
                "  POSITION maker  owner={} order={maker_order_id} realized_pnl={maker_realized_pnl_micros} balance={maker_resulting_balance_micros}",
                maker_owner_id.0
            );
            let _ = writeln!(
                out,
                "  POSITION taker  owner={} order={taker_order_id} realized_pnl={taker_realized_pnl_micros} balance={taker_resulting_balance_micros}",
                taker_owner_id.0
            );
            let _ = writeln!(
                out,
                "  FEE      maker  owner={} debit={maker_fee_micros}",
                maker_owner_id.0
            );
            let _ = writeln!(
                out,
                "  FEE      taker  owner={} debit={taker_fee_micros}",
                taker_owner_id.0
            );
        }
        JournalEvent::Liquidation {
            owner_id,
            symbol,
            qty,
            price,
            realized_pnl_micros,
            resulting_balance_micros,
        } => {
            let _ = writeln!(
                out,
                "LIQUIDATION owner={} symbol={} qty={qty} price={price} realized_pnl={realized_pnl_micros} balance={resulting_balance_micros}",
                owner_id.0, symbol.0
            );
        }
        JournalEvent::Funding {
            owner_id,
            symbol,
            amount_micros,
            resulting_balance_micros,
        } => {
            let _ = writeln!(
                out,
                "FUNDING  owner={} symbol={} amount={amount_micros} balance={resulting_balance_micros}",
                owner_id.0, symbol.0
            );
        }
        JournalEvent::Fee {
            owner_id,
            symbol,
            amount_micros,
            resulting_balance_micros,
        } => {
            let _ = writeln!(
                out,
                "FEE      owner={} symbol={:?} amount={amount_micros} balance={resulting_balance_micros}",
                owner_id.0, symbol.map(|s| s.0)
            );
        }
    }
    out
}

/// Append-only writer for the human-readable journal, backed by any `Write`
/// (a file in production, a `Vec<u8>` in tests).
pub struct HumanJournalWriter<W: Write> {
    sink: W,
}

impl<W: Write> HumanJournalWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    pub fn append(&mut self, sequence: u64, event: &JournalEvent) -> io::Result<()> {
        write!(self.sink, "#{sequence} ")?;
        self.sink.write_all(render(event).as_bytes())?;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}
