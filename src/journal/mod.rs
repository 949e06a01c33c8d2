//! Dual-speed accounting journal (spec §3/§4.4, C6).
//!
//! The hot path (inside each symbol's serialized region) publishes fixed
//! shape [`JournalEvent`]s into an [`EventRing`] and never blocks. A
//! dedicated cold worker drains the ring, appends each event to the
//! durable, CRC-checked [`BinaryJournal`] (feature `journal`) and to the
//! plain-text double-entry [`human::HumanJournalWriter`]. [`replay`]
//! re-derives live state from the binary log for audit and crash recovery.

pub mod error;
#[cfg(feature = "journal")]
pub mod file;
pub mod human;
pub mod replay;
pub mod ring;
pub mod types;

pub use error::JournalError;
#[cfg(feature = "journal")]
pub use file::BinaryJournal;
pub use ring::EventRing;
pub use types::{EventKind, JournalEvent, SequencedEvent};

use human::HumanJournalWriter;
use std::io::Write;
use std::sync::Arc;
use tracing::{error, warn};

/// Handle shared by every symbol's serialized region to publish events onto
/// the hot-path ring. Cheap to clone (an `Arc` around the ring).
#[derive(Clone)]
pub struct JournalHandle {
    ring: Arc<EventRing>,
}

impl JournalHandle {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Arc::new(EventRing::new(capacity)),
        }
    }

    #[must_use]
    pub fn ring(&self) -> Arc<EventRing> {
        self.ring.clone()
    }

    /// Publish an event from the hot path; never blocks.
    pub fn publish(&self, event: JournalEvent) -> u64 {
        self.ring.publish(event)
    }

    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.ring.dropped_count()
    }
}

/// Cold consumer: drains the ring into the durable binary log and the
/// human-readable journal. Runs on its own worker (spec §5: "a dedicated
/// cold worker"); `drain_available` processes everything currently queued
/// and returns, so the caller's scheduler decides the sleep/tick cadence.
pub struct ColdJournalWorker<W: Write> {
    ring: Arc<EventRing>,
    #[cfg(feature = "journal")]
    binary: Option<Arc<BinaryJournal>>,
    human: HumanJournalWriter<W>,
}

impl<W: Write> ColdJournalWorker<W> {
    #[cfg(feature = "journal")]
    #[must_use]
    pub fn new(ring: Arc<EventRing>, binary: Option<Arc<BinaryJournal>>, human_sink: W) -> Self {
        Self {
            ring,
            binary,
            human: HumanJournalWriter::new(human_sink),
        }
    }

    #[cfg(not(feature = "journal"))]
    #[must_use]
    pub fn new(ring: Arc<EventRing>, human_sink: W) -> Self {
        Self {
            ring,
            human: HumanJournalWriter::new(human_sink),
        }
    }

    /// Drain every event currently queued, writing each to the durable log
    /// (if enabled) and the human-readable journal. Returns the number of
    /// events drained.
    pub fn drain_available(&mut self) -> usize {
        let mut drained = 0;
        while let Some(sequenced) = self.ring.pop() {
            #[cfg(feature = "journal")]
            if let Some(binary) = &self.binary {
                if let Err(e) = binary.append(&sequenced) {
                    error!(error = %e, sequence = sequenced.sequence, "failed to append to binary journal");
                }
            }
            if let Err(e) = self.human.append(sequenced.sequence, &sequenced.event) {
                error!(error = %e, sequence = sequenced.sequence, "failed to append to human journal");
            }
            drained += 1;
        }
        if let Err(e) = self.human.flush() {
            warn!(error = %e, "failed to flush human journal");
        }
        #[cfg(feature = "journal")]
        if drained > 0 {
            if let Some(binary) = &self.binary {
                if let Err(e) = binary.sync() {
                    warn!(error = %e, "failed to fsync binary journal");
                }
            }
        }
        drained
    }

    /// Drain the ring completely before returning, for clean shutdown (spec
    /// §6: "clean shutdown drains the event ring before terminating the
    /// cold worker").
    pub fn drain_all(&mut self) {
        loop {
            if self.drain_available() == 0 {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OwnerId;

    #[test]
    fn cold_worker_drains_ring_into_human_journal() {
        let handle = JournalHandle::new(8);
        handle.publish(JournalEvent::Deposit {
            owner_id: OwnerId(1),
            amount_micros: 100,
            resulting_balance_micros: 100,
        });
        handle.publish(JournalEvent::Withdraw {
            owner_id: OwnerId(1),
            amount_micros: 40,
            resulting_balance_micros: 60,
        });

        let mut buf = Vec::new();
        #[cfg(feature = "journal")]
        let mut worker = ColdJournalWorker::new(handle.ring(), None, &mut buf);
        #[cfg(not(feature = "journal"))]
        let mut worker = ColdJournalWorker::new(handle.ring(), &mut buf);

        let drained = worker.drain_available();
        assert_eq!(drained, 2);
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("#1 DEPOSIT"));
        assert!(text.contains("#2 WITHDRAW"));
    }

    #[test]
    fn drain_all_empties_a_full_ring() {
        let handle = JournalHandle::new(4);
        for i in 0..10u64 {
            handle.publish(JournalEvent::Deposit {
                owner_id: OwnerId(1),
                amount_micros: i as i128,
                resulting_balance_micros: i as i128,
            });
        }
        let mut buf = Vec::new();
        #[cfg(feature = "journal")]
        let mut worker = ColdJournalWorker::new(handle.ring(), None, &mut buf);
        #[cfg(not(feature = "journal"))]
        let mut worker = ColdJournalWorker::new(handle.ring(), &mut buf);
        worker.drain_all();
        assert!(handle.ring.is_empty());
    }
}
