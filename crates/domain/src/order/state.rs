//! Order status state machine.

use serde::{Deserialize, Serialize};

use self::OrderStatus::*;

/// The status of an order in its lifecycle.
///
/// Transitions owned by this system:
/// ```text
/// Pending ──┬──► Paid
///           └──► Canceled
/// ```
/// `Shipped` and `Completed` are downstream states written only by the
/// fulfillment collaborator; they are representable so stored values
/// round-trip, but no operation here produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Awaiting payment; the only state payment may be requested from.
    #[default]
    Pending,

    /// Payment confirmed by the provider (terminal for this system).
    Paid,

    /// Payment failed or was abandoned (terminal for this system).
    Canceled,

    /// Handed to fulfillment (downstream).
    Shipped,

    /// Delivered (downstream).
    Completed,
}

impl OrderStatus {
    /// Returns true while the order is still awaiting payment.
    pub fn is_pending(&self) -> bool {
        matches!(self, Pending)
    }

    /// Returns true once payment reconciliation has run its course.
    pub fn is_settled(&self) -> bool {
        matches!(self, Paid | Canceled)
    }

    /// Returns true if a webhook may move the order into `target`.
    ///
    /// The guard that makes reconciliation idempotent: only a `Pending`
    /// order moves, and only into a settled state.
    pub fn can_settle_to(&self, target: OrderStatus) -> bool {
        self.is_pending() && target.is_settled()
    }

    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Pending => "PENDING",
            Paid => "PAID",
            Canceled => "CANCELED",
            Shipped => "SHIPPED",
            Completed => "COMPLETED",
        }
    }

    /// Parses a stored status name.
    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "PENDING" => Some(Pending),
            "PAID" => Some(Paid),
            "CANCELED" => Some(Canceled),
            "SHIPPED" => Some(Shipped),
            "COMPLETED" => Some(Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final payment outcome reported by the provider.
///
/// The provider's status vocabulary is open-ended; only the two values
/// below carry meaning here. Anything else is ignored by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The buyer paid the invoice.
    Succeeded,

    /// The payment failed or was abandoned.
    Failed,
}

impl PaymentOutcome {
    /// Maps a provider status string to an outcome, if it is one we act on.
    pub fn from_provider_status(status: &str) -> Option<PaymentOutcome> {
        match status {
            "success" => Some(PaymentOutcome::Succeeded),
            "failure" => Some(PaymentOutcome::Failed),
            _ => None,
        }
    }

    /// The order status this outcome settles an order into.
    pub fn target_status(&self) -> OrderStatus {
        match self {
            PaymentOutcome::Succeeded => Paid,
            PaymentOutcome::Failed => Canceled,
        }
    }
}
