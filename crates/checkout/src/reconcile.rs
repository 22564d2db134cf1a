//! Webhook reconciliation of asynchronous payment notifications.

use domain::{InvoiceId, OrderStatus, PaymentOutcome};
use order_store::{OrderStore, Settlement, StoreError};

use crate::error::{CheckoutError, Result};

/// A payment-status notification as delivered by the provider.
///
/// The status vocabulary belongs to the provider and may grow; only
/// `"success"` and `"failure"` are acted upon here.
#[derive(Debug, Clone)]
pub struct PaymentNotification {
    pub invoice_id: InvoiceId,
    pub status: String,
}

/// What a reconciliation attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The order moved out of `Pending` into the given status.
    Applied(OrderStatus),

    /// The order had already settled; the notification was a duplicate
    /// (or contradicted an earlier outcome) and changed nothing.
    Duplicate(OrderStatus),

    /// The provider status carried no meaning for this system.
    Ignored,
}

/// Applies payment notifications to orders, idempotently.
///
/// Authenticity of the notification is a concern of the layer in front
/// of this one; reconciliation itself is a pure lookup plus an atomic
/// conditional transition, so replaying any valid notification is
/// harmless.
pub struct WebhookReconciler<S: OrderStore> {
    store: S,
}

impl<S: OrderStore> WebhookReconciler<S> {
    /// Creates a new reconciler.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Maps the notification to a status transition and applies it.
    ///
    /// Duplicate deliveries and late contradictory notifications resolve
    /// to `Duplicate` without touching the order. An invoice id no order
    /// carries fails with `UnknownInvoice`.
    #[tracing::instrument(skip(self), fields(invoice_id = %notification.invoice_id))]
    pub async fn reconcile(&self, notification: &PaymentNotification) -> Result<ReconcileOutcome> {
        metrics::counter!("webhook_notifications_total").increment(1);

        let Some(outcome) = PaymentOutcome::from_provider_status(&notification.status) else {
            tracing::info!(status = %notification.status, "ignoring unrecognized payment status");
            return Ok(ReconcileOutcome::Ignored);
        };

        let settlement = self
            .store
            .settle_by_invoice(&notification.invoice_id, outcome.target_status())
            .await
            .map_err(|e| match e {
                StoreError::UnknownInvoice(invoice_id) => CheckoutError::UnknownInvoice(invoice_id),
                other => CheckoutError::Store(other),
            })?;

        match settlement {
            Settlement::Applied(order) => {
                tracing::info!(order_id = %order.id(), status = %order.status(), "order settled");
                Ok(ReconcileOutcome::Applied(order.status()))
            }
            Settlement::AlreadySettled(order) => {
                tracing::debug!(order_id = %order.id(), status = %order.status(), "duplicate notification");
                Ok(ReconcileOutcome::Duplicate(order.status()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use common::OrderId;
    use domain::{Money, Order, OrderLine, UserId};
    use order_store::InMemoryOrderStore;

    use super::*;

    fn notification(invoice: &str, status: &str) -> PaymentNotification {
        PaymentNotification {
            invoice_id: InvoiceId::new(invoice),
            status: status.to_string(),
        }
    }

    async fn reconciler_with_invoiced_order() -> (WebhookReconciler<InMemoryOrderStore>, InMemoryOrderStore) {
        let store = InMemoryOrderStore::new();
        let order = Order::from_cart(
            OrderId::new(),
            UserId::new(),
            vec![OrderLine::new("PRD-A", "Chamomile tea", 1, Money::from_minor(1000))],
        )
        .unwrap();
        store.insert(&order).await.unwrap();
        store
            .assign_invoice(order.id(), &InvoiceId::new("INV-1"))
            .await
            .unwrap();
        (WebhookReconciler::new(store.clone()), store)
    }

    #[tokio::test]
    async fn success_notification_settles_paid() {
        let (reconciler, store) = reconciler_with_invoiced_order().await;

        let outcome = reconciler
            .reconcile(&notification("INV-1", "success"))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Applied(OrderStatus::Paid));

        let order = store
            .get_by_invoice(&InvoiceId::new("INV-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status(), OrderStatus::Paid);
    }

    #[tokio::test]
    async fn failure_notification_settles_canceled() {
        let (reconciler, store) = reconciler_with_invoiced_order().await;

        let outcome = reconciler
            .reconcile(&notification("INV-1", "failure"))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Applied(OrderStatus::Canceled));

        let order = store
            .get_by_invoice(&InvoiceId::new("INV-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status(), OrderStatus::Canceled);
    }

    #[tokio::test]
    async fn duplicate_delivery_is_a_noop() {
        let (reconciler, _store) = reconciler_with_invoiced_order().await;

        let first = reconciler
            .reconcile(&notification("INV-1", "success"))
            .await
            .unwrap();
        let second = reconciler
            .reconcile(&notification("INV-1", "success"))
            .await
            .unwrap();

        assert_eq!(first, ReconcileOutcome::Applied(OrderStatus::Paid));
        assert_eq!(second, ReconcileOutcome::Duplicate(OrderStatus::Paid));
    }

    #[tokio::test]
    async fn late_contradictory_notification_is_ignored() {
        let (reconciler, store) = reconciler_with_invoiced_order().await;

        reconciler
            .reconcile(&notification("INV-1", "success"))
            .await
            .unwrap();
        let late = reconciler
            .reconcile(&notification("INV-1", "failure"))
            .await
            .unwrap();

        assert_eq!(late, ReconcileOutcome::Duplicate(OrderStatus::Paid));
        let order = store
            .get_by_invoice(&InvoiceId::new("INV-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status(), OrderStatus::Paid);
    }

    #[tokio::test]
    async fn unrecognized_status_is_ignored_without_lookup() {
        let (reconciler, store) = reconciler_with_invoiced_order().await;

        let outcome = reconciler
            .reconcile(&notification("INV-1", "processing"))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Ignored);

        let order = store
            .get_by_invoice(&InvoiceId::new("INV-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_invoice_is_an_error() {
        let (reconciler, _store) = reconciler_with_invoiced_order().await;

        let err = reconciler
            .reconcile(&notification("INV-MISSING", "success"))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::UnknownInvoice(_)));
    }
}
