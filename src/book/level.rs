//! A single price level: a price-time FIFO queue of resting order ids plus
//! its aggregate remaining quantity (spec §3, Book Level invariant: level
//! quantity equals the sum of its orders' remaining).

use crate::types::{OrderId, Price, Qty};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct Level {
    pub price: Price,
    orders: Mutex<VecDeque<OrderId>>,
    total_remaining: AtomicU64,
}

impl Level {
    #[must_use]
    pub fn new(price: Price) -> Self {
        Self {
            price,
            orders: Mutex::new(VecDeque::new()),
            total_remaining: AtomicU64::new(0),
        }
    }

    pub fn push_back(&self, order_id: OrderId, qty: Qty) {
        self.orders
            .lock()
            .expect("level orders mutex poisoned")
            .push_back(order_id);
        self.total_remaining.fetch_add(qty.0, Ordering::SeqCst);
    }

    /// Remove a specific order (used by cancel, which need not be at the
    /// front of the queue).
    pub fn remove(&self, order_id: OrderId, qty: Qty) {
        let mut orders = self.orders.lock().expect("level orders mutex poisoned");
        if let Some(pos) = orders.iter().position(|id| *id == order_id) {
            orders.remove(pos);
            self.total_remaining.fetch_sub(qty.0, Ordering::SeqCst);
        }
    }

    #[must_use]
    pub fn front(&self) -> Option<OrderId> {
        self.orders.lock().expect("level orders mutex poisoned").front().copied()
    }

    pub fn pop_front(&self) {
        self.orders.lock().expect("level orders mutex poisoned").pop_front();
    }

    /// Reduce the level's aggregate remaining quantity by `qty` (a partial
    /// fill against the order at the front of the queue). Does not remove
    /// the order id — callers pop the front separately once it reaches zero.
    pub fn reduce(&self, qty: Qty) {
        self.total_remaining.fetch_sub(qty.0, Ordering::SeqCst);
    }

    #[must_use]
    pub fn total_remaining(&self) -> Qty {
        Qty::new(self.total_remaining.load(Ordering::SeqCst))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.lock().expect("level orders mutex poisoned").is_empty()
    }

    #[must_use]
    pub fn order_count(&self) -> usize {
        self.orders.lock().expect("level orders mutex poisoned").len()
    }
}
