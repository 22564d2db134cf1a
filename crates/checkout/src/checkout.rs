//! Checkout orchestration: cart snapshot to immutable order.

use std::sync::Arc;

use common::OrderId;
use domain::{Order, OrderLine, ProductId, UserId};
use order_store::OrderStore;

use crate::error::{CheckoutError, Result};
use crate::lock::KeyedLock;
use crate::services::{CartService, IdentityService, ProductCatalog};

/// Converts a user's cart into a priced, immutable order.
///
/// The whole read-cart / write-order / drain-cart sequence runs under a
/// per-user lock: two concurrent checkouts for one user can never both
/// consume the same cart.
pub struct CheckoutService<S: OrderStore> {
    store: S,
    cart: Arc<dyn CartService>,
    catalog: Arc<dyn ProductCatalog>,
    identity: Arc<dyn IdentityService>,
    user_locks: KeyedLock<UserId>,
}

impl<S: OrderStore> CheckoutService<S> {
    /// Creates a new checkout service.
    pub fn new(
        store: S,
        cart: Arc<dyn CartService>,
        catalog: Arc<dyn ProductCatalog>,
        identity: Arc<dyn IdentityService>,
    ) -> Self {
        Self {
            store,
            cart,
            catalog,
            identity,
            user_locks: KeyedLock::new(),
        }
    }

    /// Creates an order from the user's current cart and drains the cart.
    ///
    /// The cart is drained only after the order and its lines are
    /// persisted, using the product references recorded on the order; a
    /// failed drain is retried once before the error propagates.
    #[tracing::instrument(skip(self))]
    pub async fn create_order(&self, user_id: UserId) -> Result<Order> {
        metrics::counter!("checkouts_total").increment(1);
        let started = std::time::Instant::now();

        let _guard = self.user_locks.acquire(user_id).await;

        if !self.identity.user_exists(user_id).await? {
            return Err(CheckoutError::UserNotFound(user_id));
        }

        let cart_lines = self.cart.lines_for(user_id).await?;
        if cart_lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        // Freeze each line's name and unit price as of right now.
        let mut lines = Vec::with_capacity(cart_lines.len());
        for cart_line in &cart_lines {
            let snapshot = self
                .catalog
                .resolve(&cart_line.product_id)
                .await?
                .ok_or_else(|| CheckoutError::ProductNotFound(cart_line.product_id.clone()))?;
            lines.push(OrderLine::new(
                snapshot.product_id,
                snapshot.name,
                cart_line.quantity,
                snapshot.unit_price,
            ));
        }

        let order = Order::from_cart(OrderId::new(), user_id, lines)?;
        self.store.insert(&order).await?;

        let consumed: Vec<ProductId> = order
            .lines()
            .iter()
            .map(|line| line.product_id.clone())
            .collect();

        if let Err(error) = self.cart.drain(user_id, &consumed).await {
            tracing::warn!(%user_id, order_id = %order.id(), %error, "cart drain failed, retrying");
            self.cart.drain(user_id, &consumed).await?;
        }

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(order_id = %order.id(), total = %order.total(), "order created");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use domain::{Money, OrderStatus};
    use order_store::InMemoryOrderStore;

    use super::*;
    use crate::services::{InMemoryCartService, InMemoryIdentityService, InMemoryProductCatalog};

    struct Fixture {
        service: Arc<CheckoutService<InMemoryOrderStore>>,
        store: InMemoryOrderStore,
        cart: InMemoryCartService,
        catalog: InMemoryProductCatalog,
        identity: InMemoryIdentityService,
    }

    fn fixture() -> Fixture {
        let store = InMemoryOrderStore::new();
        let cart = InMemoryCartService::new();
        let catalog = InMemoryProductCatalog::new();
        let identity = InMemoryIdentityService::new();
        let service = Arc::new(CheckoutService::new(
            store.clone(),
            Arc::new(cart.clone()),
            Arc::new(catalog.clone()),
            Arc::new(identity.clone()),
        ));
        Fixture {
            service,
            store,
            cart,
            catalog,
            identity,
        }
    }

    fn seed_two_line_cart(f: &Fixture, user: UserId) {
        f.identity.register_user(user);
        f.catalog
            .add_product("PRD-A", "Chamomile tea", Money::from_minor(1000));
        f.catalog
            .add_product("PRD-B", "Lavender oil", Money::from_minor(500));
        f.cart.add_line(user, "PRD-A", 3);
        f.cart.add_line(user, "PRD-B", 1);
    }

    #[tokio::test]
    async fn checkout_prices_lines_and_drains_cart() {
        let f = fixture();
        let user = UserId::new();
        seed_two_line_cart(&f, user);

        let order = f.service.create_order(user).await.unwrap();

        assert_eq!(order.total().minor(), 3500);
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.lines().len(), 2);
        assert_eq!(order.lines()[0].product_name, "Chamomile tea");
        assert_eq!(f.cart.line_count(user), 0);

        let stored = f.store.get(order.id()).await.unwrap().unwrap();
        assert_eq!(stored, order);
    }

    #[tokio::test]
    async fn checkout_total_is_immune_to_later_price_edits() {
        let f = fixture();
        let user = UserId::new();
        seed_two_line_cart(&f, user);

        let order = f.service.create_order(user).await.unwrap();
        f.catalog
            .add_product("PRD-A", "Chamomile tea", Money::from_minor(9999));

        let stored = f.store.get(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.total().minor(), 3500);
        assert_eq!(stored.lines()[0].unit_price.minor(), 1000);
    }

    #[tokio::test]
    async fn checkout_unknown_user_fails() {
        let f = fixture();
        let user = UserId::new();

        let err = f.service.create_order(user).await.unwrap_err();
        assert!(matches!(err, CheckoutError::UserNotFound(u) if u == user));
        assert_eq!(f.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn checkout_empty_cart_fails_and_creates_nothing() {
        let f = fixture();
        let user = UserId::new();
        f.identity.register_user(user);

        let err = f.service.create_order(user).await.unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
        assert_eq!(f.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn checkout_missing_product_fails() {
        let f = fixture();
        let user = UserId::new();
        f.identity.register_user(user);
        f.cart.add_line(user, "PRD-GONE", 1);

        let err = f.service.create_order(user).await.unwrap_err();
        assert!(matches!(err, CheckoutError::ProductNotFound(_)));
        assert_eq!(f.store.order_count().await, 0);
        // The cart is untouched on failure.
        assert_eq!(f.cart.line_count(user), 1);
    }

    #[tokio::test]
    async fn concurrent_checkouts_produce_exactly_one_order() {
        let f = fixture();
        let user = UserId::new();
        seed_two_line_cart(&f, user);

        let (first, second) = tokio::join!(
            f.service.create_order(user),
            f.service.create_order(user)
        );

        // The per-user lock serializes the two calls: the loser sees the
        // drained cart and fails with EmptyCart instead of double-charging.
        let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        let failure = if first.is_err() { first } else { second };
        assert!(matches!(failure.unwrap_err(), CheckoutError::EmptyCart));

        assert_eq!(f.store.order_count().await, 1);
        assert_eq!(f.cart.line_count(user), 0);
    }

    #[tokio::test]
    async fn drain_failure_surfaces_after_retry() {
        let f = fixture();
        let user = UserId::new();
        seed_two_line_cart(&f, user);
        f.cart.set_fail_on_drain(true);

        let err = f.service.create_order(user).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Cart(_)));

        // The order exists; the recorded lines allow a compensating drain.
        assert_eq!(f.store.order_count().await, 1);
        let order = &f.store.list_for_user(user).await.unwrap()[0];
        assert_eq!(order.lines().len(), 2);
    }
}
