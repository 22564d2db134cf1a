//! Payment requests against the external provider.

use common::OrderId;
use order_store::{OrderStore, StoreError};

use crate::error::{CheckoutError, Result};
use crate::gateway::{InvoiceRequest, PaymentGateway};
use crate::lock::KeyedLock;

/// Where to send the buyer after a successful invoice request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRedirect {
    pub order_id: OrderId,
    pub payment_url: String,
}

/// Requests invoices from the payment provider for pending orders.
///
/// Calls are serialized per order, so the status check and the invoice
/// write cannot interleave with a second request for the same order. A
/// deliberate sequential re-request on a still-pending order is allowed
/// and replaces the invoice identifier.
pub struct PaymentService<S: OrderStore, G: PaymentGateway> {
    store: S,
    gateway: G,
    order_locks: KeyedLock<OrderId>,
}

impl<S: OrderStore, G: PaymentGateway> PaymentService<S, G> {
    /// Creates a new payment service.
    pub fn new(store: S, gateway: G) -> Self {
        Self {
            store,
            gateway,
            order_locks: KeyedLock::new(),
        }
    }

    /// Creates an invoice for a pending order and records its identifier.
    ///
    /// On any gateway failure the order is left unchanged (still
    /// `Pending`, previous invoice id intact), so the call is safe to
    /// retry.
    #[tracing::instrument(skip(self))]
    pub async fn request_payment(&self, order_id: OrderId) -> Result<PaymentRedirect> {
        metrics::counter!("payment_requests_total").increment(1);

        let _guard = self.order_locks.acquire(order_id).await;

        let order = self
            .store
            .get(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;

        if !order.status().is_pending() {
            return Err(CheckoutError::OrderAlreadyProcessed {
                order_id,
                status: order.status(),
            });
        }

        let request = InvoiceRequest::for_order(&order);
        let receipt = self.gateway.create_invoice(&request).await?;

        match self.store.assign_invoice(order_id, &receipt.invoice_id).await {
            Ok(()) => {}
            // A webhook settled the order while the gateway call was in
            // flight; the order must not be re-invoiced.
            Err(StoreError::OrderNotPending { status, .. }) => {
                return Err(CheckoutError::OrderAlreadyProcessed { order_id, status });
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(invoice_id = %receipt.invoice_id, "invoice created");
        Ok(PaymentRedirect {
            order_id,
            payment_url: receipt.page_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use domain::{InvoiceId, Money, Order, OrderLine, OrderStatus, UserId};
    use order_store::InMemoryOrderStore;

    use super::*;
    use crate::gateway::MockPaymentGateway;

    fn sample_order() -> Order {
        Order::from_cart(
            OrderId::new(),
            UserId::new(),
            vec![
                OrderLine::new("PRD-A", "Chamomile tea", 3, Money::from_minor(1000)),
                OrderLine::new("PRD-B", "Lavender oil", 1, Money::from_minor(500)),
            ],
        )
        .unwrap()
    }

    async fn service_with_order() -> (
        PaymentService<InMemoryOrderStore, MockPaymentGateway>,
        InMemoryOrderStore,
        MockPaymentGateway,
        OrderId,
    ) {
        let store = InMemoryOrderStore::new();
        let gateway = MockPaymentGateway::new();
        let order = sample_order();
        store.insert(&order).await.unwrap();
        let service = PaymentService::new(store.clone(), gateway.clone());
        (service, store, gateway, order.id())
    }

    #[tokio::test]
    async fn request_payment_records_invoice_and_keeps_pending() {
        let (service, store, gateway, order_id) = service_with_order().await;

        let redirect = service.request_payment(order_id).await.unwrap();

        assert_eq!(redirect.order_id, order_id);
        assert!(redirect.payment_url.contains("INV-0001"));

        let order = store.get(order_id).await.unwrap().unwrap();
        assert_eq!(order.invoice_id().unwrap().as_str(), "INV-0001");
        assert_eq!(order.status(), OrderStatus::Pending);

        // The request carried the frozen total and basket.
        let request = gateway.last_request().unwrap();
        assert_eq!(request.amount.minor(), 3500);
        assert_eq!(request.basket.len(), 2);
        assert_eq!(request.reference, order_id);
    }

    #[tokio::test]
    async fn re_request_on_pending_order_issues_fresh_invoice() {
        let (service, store, _gateway, order_id) = service_with_order().await;

        service.request_payment(order_id).await.unwrap();
        service.request_payment(order_id).await.unwrap();

        let order = store.get(order_id).await.unwrap().unwrap();
        assert_eq!(order.invoice_id().unwrap().as_str(), "INV-0002");
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[tokio::test]
    async fn request_payment_unknown_order_fails() {
        let (service, _store, _gateway, _order_id) = service_with_order().await;

        let err = service.request_payment(OrderId::new()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn request_payment_on_settled_order_fails() {
        let (service, store, _gateway, order_id) = service_with_order().await;

        service.request_payment(order_id).await.unwrap();
        store
            .settle_by_invoice(&InvoiceId::new("INV-0001"), OrderStatus::Paid)
            .await
            .unwrap();

        let err = service.request_payment(order_id).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::OrderAlreadyProcessed {
                status: OrderStatus::Paid,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn gateway_failure_leaves_order_untouched() {
        let (service, store, gateway, order_id) = service_with_order().await;
        gateway.set_fail_on_create(true);

        let err = service.request_payment(order_id).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Gateway(_)));

        let order = store.get(order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Pending);
        assert!(order.invoice_id().is_none());

        // Safe to retry once the gateway recovers.
        gateway.set_fail_on_create(false);
        service.request_payment(order_id).await.unwrap();
        let order = store.get(order_id).await.unwrap().unwrap();
        assert!(order.invoice_id().is_some());
    }
}
