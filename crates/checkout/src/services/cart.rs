//! Cart collaborator trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{ProductId, UserId};

use crate::error::CheckoutError;

/// One line of a user's cart: a product reference and a quantity.
///
/// Prices are not part of the cart; they are resolved against the
/// catalog at checkout time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Trait for reading and draining a user's cart.
#[async_trait]
pub trait CartService: Send + Sync {
    /// Returns the user's current cart lines.
    async fn lines_for(&self, user_id: UserId) -> Result<Vec<CartLine>, CheckoutError>;

    /// Deletes the given product references from the user's cart.
    ///
    /// Callers pass the product references recorded on a persisted
    /// order, so a retried drain removes exactly the consumed lines.
    async fn drain(&self, user_id: UserId, product_ids: &[ProductId])
    -> Result<(), CheckoutError>;
}

#[derive(Debug, Default)]
struct InMemoryCartState {
    carts: HashMap<UserId, Vec<CartLine>>,
    fail_on_drain: bool,
}

/// In-memory cart service for testing and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartService {
    state: Arc<RwLock<InMemoryCartState>>,
}

impl InMemoryCartService {
    /// Creates a new empty in-memory cart service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a line to a user's cart, merging quantities for an existing
    /// product.
    pub fn add_line(&self, user_id: UserId, product_id: impl Into<ProductId>, quantity: u32) {
        let product_id = product_id.into();
        let mut state = self.state.write().unwrap();
        let cart = state.carts.entry(user_id).or_default();
        match cart.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity += quantity,
            None => cart.push(CartLine {
                product_id,
                quantity,
            }),
        }
    }

    /// Returns the number of lines in a user's cart.
    pub fn line_count(&self, user_id: UserId) -> usize {
        self.state
            .read()
            .unwrap()
            .carts
            .get(&user_id)
            .map_or(0, Vec::len)
    }

    /// Configures the service to fail drain calls.
    pub fn set_fail_on_drain(&self, fail: bool) {
        self.state.write().unwrap().fail_on_drain = fail;
    }
}

#[async_trait]
impl CartService for InMemoryCartService {
    async fn lines_for(&self, user_id: UserId) -> Result<Vec<CartLine>, CheckoutError> {
        let state = self.state.read().unwrap();
        Ok(state.carts.get(&user_id).cloned().unwrap_or_default())
    }

    async fn drain(
        &self,
        user_id: UserId,
        product_ids: &[ProductId],
    ) -> Result<(), CheckoutError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_drain {
            return Err(CheckoutError::Cart("drain unavailable".to_string()));
        }

        if let Some(cart) = state.carts.get_mut(&user_id) {
            cart.retain(|line| !product_ids.contains(&line.product_id));
        }
        Ok(())
    }
}
