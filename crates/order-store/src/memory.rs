use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use domain::{InvoiceId, Order, OrderStatus, UserId};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    store::{OrderStore, Settlement},
};

#[derive(Default)]
struct MemoryState {
    orders: HashMap<OrderId, Order>,
    /// invoice id -> order id, mirroring the unique index in Postgres.
    invoices: HashMap<InvoiceId, OrderId>,
}

/// In-memory order store for tests and local runs.
///
/// Provides the same interface and conditional-update semantics as the
/// PostgreSQL implementation; every conditional check runs under one
/// write lock, so it is atomic with respect to concurrent callers.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Clears all orders.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.orders.clear();
        state.invoices.clear();
    }
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    orders
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;
        if state.orders.contains_key(&order.id()) {
            return Err(StoreError::DuplicateOrder(order.id()));
        }
        if let Some(invoice_id) = order.invoice_id() {
            state.invoices.insert(invoice_id.clone(), order.id());
        }
        state.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn get_by_invoice(&self, invoice_id: &InvoiceId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .invoices
            .get(invoice_id)
            .and_then(|id| state.orders.get(id))
            .cloned())
    }

    async fn assign_invoice(&self, id: OrderId, invoice_id: &InvoiceId) -> Result<()> {
        let mut state = self.state.write().await;

        if let Some(owner) = state.invoices.get(invoice_id)
            && *owner != id
        {
            return Err(StoreError::DuplicateInvoice(invoice_id.clone()));
        }

        let order = state
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;

        let previous = order.invoice_id().cloned();
        if order.assign_invoice(invoice_id.clone()).is_err() {
            return Err(StoreError::OrderNotPending {
                order_id: id,
                status: order.status(),
            });
        }

        if let Some(previous) = previous {
            state.invoices.remove(&previous);
        }
        state.invoices.insert(invoice_id.clone(), id);
        Ok(())
    }

    async fn settle_by_invoice(
        &self,
        invoice_id: &InvoiceId,
        target: OrderStatus,
    ) -> Result<Settlement> {
        let mut state = self.state.write().await;

        let order_id = *state
            .invoices
            .get(invoice_id)
            .ok_or_else(|| StoreError::UnknownInvoice(invoice_id.clone()))?;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;

        // The aggregate's own guard is the compare-and-set: it only
        // succeeds from Pending, inside this write lock.
        match order.settle(target) {
            Ok(()) => Ok(Settlement::Applied(order.clone())),
            Err(_) => Ok(Settlement::AlreadySettled(order.clone())),
        }
    }

    async fn list_all(&self) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Ok(newest_first(state.orders.values().cloned().collect()))
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Ok(newest_first(
            state
                .orders
                .values()
                .filter(|o| o.user_id() == user_id)
                .cloned()
                .collect(),
        ))
    }
}
