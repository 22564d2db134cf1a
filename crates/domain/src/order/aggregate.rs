//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use super::{InvoiceId, Money, OrderError, OrderLine, OrderStatus, UserId};

/// Order aggregate root.
///
/// An immutable financial record created from a cart at checkout time.
/// The line prices and total are a historical snapshot; after creation
/// the only permitted mutations are invoice-identifier assignment and
/// status transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// External-facing identifier, stable and never reused.
    id: OrderId,

    /// The user who checked out.
    user_id: UserId,

    /// Lines in insertion order (creation order, not reorderable).
    lines: Vec<OrderLine>,

    /// Total price computed once at creation.
    total: Money,

    /// Current status.
    status: OrderStatus,

    /// Invoice identifier, set once payment has been requested.
    invoice_id: Option<InvoiceId>,

    /// Creation timestamp.
    created_at: DateTime<Utc>,
}

impl Order {
    /// Creates an order from priced cart lines.
    ///
    /// Validates every line (positive quantity, positive unit price) and
    /// computes the frozen total. Fails with `EmptyCart` on zero lines.
    pub fn from_cart(id: OrderId, user_id: UserId, lines: Vec<OrderLine>) -> Result<Self, OrderError> {
        if lines.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        for line in &lines {
            if line.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    quantity: line.quantity,
                });
            }
            if !line.unit_price.is_positive() {
                return Err(OrderError::InvalidPrice {
                    minor: line.unit_price.minor(),
                });
            }
        }

        let total = lines.iter().map(OrderLine::line_total).sum();

        Ok(Self {
            id,
            user_id,
            lines,
            total,
            status: OrderStatus::Pending,
            invoice_id: None,
            created_at: Utc::now(),
        })
    }

    /// Reassembles an order from stored fields.
    ///
    /// For persistence-layer use only; performs no validation beyond what
    /// was checked at creation.
    pub fn rehydrate(
        id: OrderId,
        user_id: UserId,
        lines: Vec<OrderLine>,
        total: Money,
        status: OrderStatus,
        invoice_id: Option<InvoiceId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            lines,
            total,
            status,
            invoice_id,
            created_at,
        }
    }
}

// Query methods
impl Order {
    /// Returns the external order identifier.
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the owning user.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the lines in insertion order.
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Returns the total price frozen at creation.
    pub fn total(&self) -> Money {
        self.total
    }

    /// Returns the current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the invoice identifier, if payment has been requested.
    pub fn invoice_id(&self) -> Option<&InvoiceId> {
        self.invoice_id.as_ref()
    }

    /// Returns the creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

// Mutations (the only two the aggregate permits)
impl Order {
    /// Records the invoice identifier returned by the payment provider.
    ///
    /// Re-requesting payment on a still-pending order replaces the
    /// previous invoice id; the status is untouched.
    pub fn assign_invoice(&mut self, invoice_id: InvoiceId) -> Result<(), OrderError> {
        if !self.status.is_pending() {
            return Err(OrderError::AlreadyProcessed {
                status: self.status,
            });
        }
        self.invoice_id = Some(invoice_id);
        Ok(())
    }

    /// Applies a settlement transition.
    ///
    /// Succeeds only from `Pending` into a settled state; any other
    /// combination is rejected so callers are forced to treat duplicates
    /// explicitly.
    pub fn settle(&mut self, target: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_settle_to(target) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        Ok(())
    }
}
