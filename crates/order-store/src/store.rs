use async_trait::async_trait;
use common::OrderId;
use domain::{InvoiceId, Order, OrderStatus, UserId};

use crate::Result;

/// Outcome of a settlement attempt keyed by invoice identifier.
#[derive(Debug, Clone)]
pub enum Settlement {
    /// The order was pending; the transition was applied and persisted.
    Applied(Order),

    /// The order had already left `Pending`; nothing was changed.
    ///
    /// This is the duplicate-delivery case, reported as data rather than
    /// as an error so callers acknowledge it explicitly.
    AlreadySettled(Order),
}

impl Settlement {
    /// Returns the order as it stands after the attempt.
    pub fn order(&self) -> &Order {
        match self {
            Settlement::Applied(order) | Settlement::AlreadySettled(order) => order,
        }
    }

    /// Returns true if the transition was applied.
    pub fn was_applied(&self) -> bool {
        matches!(self, Settlement::Applied(_))
    }
}

/// Core trait for order persistence.
///
/// An order and its lines are written and read as one aggregate; no
/// caller ever sees a partially persisted order. All implementations
/// must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order together with all of its lines.
    ///
    /// Atomic: either the order and every line are stored, or nothing is.
    /// Fails with `DuplicateOrder` if the id is already taken.
    async fn insert(&self, order: &Order) -> Result<()>;

    /// Retrieves an order with its lines in insertion order.
    async fn get(&self, id: OrderId) -> Result<Option<Order>>;

    /// Retrieves the order carrying the given invoice identifier.
    async fn get_by_invoice(&self, invoice_id: &InvoiceId) -> Result<Option<Order>>;

    /// Records the provider-issued invoice identifier on a pending order.
    ///
    /// Conditional: fails with `OrderNotPending` if a settlement raced in
    /// since the caller last read the order, and with `DuplicateInvoice`
    /// if another order already carries the identifier. Re-assigning a
    /// fresh invoice to the same pending order is allowed.
    async fn assign_invoice(&self, id: OrderId, invoice_id: &InvoiceId) -> Result<()>;

    /// Applies a status transition for the order carrying `invoice_id`.
    ///
    /// Compare-and-set semantics: the `Pending` check and the update are
    /// one atomic operation, never a read followed by a separate write.
    /// Fails with `UnknownInvoice` when no order carries the identifier.
    async fn settle_by_invoice(
        &self,
        invoice_id: &InvoiceId,
        target: OrderStatus,
    ) -> Result<Settlement>;

    /// Returns every order, newest first.
    async fn list_all(&self) -> Result<Vec<Order>>;

    /// Returns one user's orders, newest first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>>;
}
