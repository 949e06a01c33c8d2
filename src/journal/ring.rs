//! Hot-path event ring (spec §4.4/§5, C6).
//!
//! The matching engine's serialized regions publish [`SequencedEvent`]s into
//! this ring; a dedicated cold worker drains it. `crossbeam::queue::ArrayQueue`
//! is a lock-free bounded MPMC queue, which generalizes the spec's described
//! single-producer shape to the reality that several symbols' regions publish
//! concurrently (see DESIGN.md) while keeping the producer side wait-free: a
//! full ring never blocks, it just counts the drop and the operation that
//! produced the event still completes.

use super::types::{JournalEvent, SequencedEvent};
use crate::utils::current_time_nanos;
use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared, lock-free event ring plus the monotonic sequence counter that
/// stamps every event pushed into it. Sequence numbers are gap-free across
/// the process lifetime regardless of how many symbol regions are pushing
/// concurrently, because they are minted here, not in the ring itself.
pub struct EventRing {
    queue: ArrayQueue<SequencedEvent>,
    next_sequence: AtomicU64,
    dropped: AtomicU64,
}

impl EventRing {
    /// `capacity` must be a power of two (validated by `ExchangeConfig`).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            next_sequence: AtomicU64::new(1),
            dropped: AtomicU64::new(0),
        }
    }

    /// Stamp `event` with the next sequence number and wall-clock timestamp,
    /// then push it. Never blocks: on a full ring the event is dropped and
    /// the drop counter increments, but the caller still gets its sequence
    /// number back (the event existed and was accounted for even though it
    /// was not durably recorded — spec §3 Event invariant: "no event is
    /// silently dropped on the hot path").
    pub fn publish(&self, event: JournalEvent) -> u64 {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let sequenced = SequencedEvent {
            sequence,
            timestamp_ns: current_time_nanos(),
            event,
        };
        if self.queue.push(sequenced).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            #[cfg(feature = "metrics")]
            metrics::counter!("perp_core_event_ring_dropped_total").increment(1);
        }
        sequence
    }

    /// Pop the next event for the cold consumer, if any is queued.
    pub fn pop(&self) -> Option<SequencedEvent> {
        self.queue.pop()
    }

    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OwnerId, SignedMicros};

    fn deposit(owner: u64, amount: SignedMicros) -> JournalEvent {
        JournalEvent::Deposit {
            owner_id: OwnerId(owner),
            amount_micros: amount,
            resulting_balance_micros: amount,
        }
    }

    #[test]
    fn sequence_numbers_are_gap_free() {
        let ring = EventRing::new(8);
        let seqs: Vec<u64> = (0..5).map(|i| ring.publish(deposit(1, i))).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn full_ring_drops_and_counts_but_keeps_minting_sequence() {
        let ring = EventRing::new(2);
        ring.publish(deposit(1, 1));
        ring.publish(deposit(1, 2));
        let dropped_seq = ring.publish(deposit(1, 3));
        assert_eq!(dropped_seq, 3);
        assert_eq!(ring.dropped_count(), 1);
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn pop_drains_in_push_order() {
        let ring = EventRing::new(8);
        ring.publish(deposit(1, 10));
        ring.publish(deposit(1, 20));
        let first = ring.pop().unwrap();
        let second = ring.pop().unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert!(ring.pop().is_none());
    }
}
