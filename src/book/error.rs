//! Order book / matching error types.

use crate::types::{OrderId, Price, Qty, Side};
use std::fmt;

#[derive(Debug)]
#[non_exhaustive]
pub enum BookError {
    OrderNotFound { order_id: OrderId },

    /// Limit price is not a multiple of the symbol's tick size.
    InvalidTickSize { price: Price, tick_size: Price },

    /// Quantity is outside the symbol's configured min/max range.
    OrderSizeOutOfRange {
        quantity: Qty,
        min: Qty,
        max: Qty,
    },

    /// A post-only order would have crossed the book at entry.
    PostOnlyWouldCross { side: Side, price: Price },

    /// A fill-or-kill order could not be filled in full immediately.
    FokUnsatisfiable { requested: Qty, available: Qty },

    /// Attempted to cancel or modify an order already in a terminal state.
    AlreadyTerminal { order_id: OrderId },

    /// `client_order_id` was already used by this owner on this symbol.
    DuplicateClientId { owner_id: crate::types::OwnerId, client_order_id: u64 },
}

impl fmt::Display for BookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookError::OrderNotFound { order_id } => write!(f, "order not found: {order_id}"),
            BookError::InvalidTickSize { price, tick_size } => write!(
                f,
                "invalid tick size: price {price} is not a multiple of tick size {tick_size}"
            ),
            BookError::OrderSizeOutOfRange { quantity, min, max } => write!(
                f,
                "order size out of range: quantity {quantity}, min {min}, max {max}"
            ),
            BookError::PostOnlyWouldCross { side, price } => {
                write!(f, "post-only {side} order at {price} would cross the book")
            }
            BookError::FokUnsatisfiable { requested, available } => write!(
                f,
                "fill-or-kill unsatisfiable: requested {requested}, available {available}"
            ),
            BookError::AlreadyTerminal { order_id } => {
                write!(f, "order {order_id} is already in a terminal state")
            }
            BookError::DuplicateClientId { owner_id, client_order_id } => write!(
                f,
                "owner {owner_id:?}: client order id {client_order_id} was already used"
            ),
        }
    }
}

impl std::error::Error for BookError {}
