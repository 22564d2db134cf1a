//! Checkout error types.

use common::OrderId;
use domain::{InvoiceId, OrderError, OrderStatus, ProductId, UserId};
use order_store::StoreError;
use thiserror::Error;

use crate::gateway::GatewayError;

/// Errors that can occur during checkout, payment, and reconciliation.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The user reference is invalid.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// The user's cart has no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// A cart line references a product the catalog no longer resolves.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The order was not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Payment was requested on an order that already left `Pending`.
    #[error("Order {order_id} already processed (status: {status})")]
    OrderAlreadyProcessed {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// The payment provider rejected or failed the invoice request.
    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// A notification carried an invoice id no order knows.
    #[error("Unknown invoice: {0}")]
    UnknownInvoice(InvoiceId),

    /// Cart collaborator error.
    #[error("Cart service error: {0}")]
    Cart(String),

    /// Catalog collaborator error.
    #[error("Catalog service error: {0}")]
    Catalog(String),

    /// Identity collaborator error.
    #[error("Identity service error: {0}")]
    Identity(String),

    /// Domain validation error.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Order store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
