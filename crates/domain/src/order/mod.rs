//! Order aggregate and related types.

mod aggregate;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use state::{OrderStatus, PaymentOutcome};
pub use value_objects::{InvoiceId, Money, OrderLine, ProductId, UserId};

use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Checkout requires at least one cart line.
    #[error("Cart is empty")]
    EmptyCart,

    /// Line quantity must be positive.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Unit price must be positive.
    #[error("Invalid unit price: {minor} (must be greater than 0)")]
    InvalidPrice { minor: i64 },

    /// Order is no longer awaiting payment.
    #[error("Order already processed (status: {status})")]
    AlreadyProcessed { status: OrderStatus },

    /// The requested status is not reachable from the order's current state.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}
