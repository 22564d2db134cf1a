use common::OrderId;
use domain::{InvoiceId, OrderStatus};
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An order with this id already exists.
    #[error("Duplicate order: {0}")]
    DuplicateOrder(OrderId),

    /// The order was not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A conditional update required the order to still be pending.
    #[error("Order {order_id} is no longer pending (status: {status})")]
    OrderNotPending {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// The invoice identifier is already attached to another order.
    ///
    /// Invoice uniqueness is what lets a notification be routed
    /// unambiguously, so this is rejected rather than overwritten.
    #[error("Invoice {0} already belongs to another order")]
    DuplicateInvoice(InvoiceId),

    /// No order carries this invoice identifier.
    #[error("Unknown invoice: {0}")]
    UnknownInvoice(InvoiceId),

    /// A stored status column held an unrecognized value.
    #[error("Invalid stored status: {0}")]
    InvalidStatus(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
