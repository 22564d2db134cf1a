//! Product catalog collaborator trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{Money, ProductId};

use crate::error::CheckoutError;

/// A product's checkout-relevant fields at the moment of resolution.
///
/// The unit price here is the live catalog price; the checkout freezes
/// it onto the order line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
}

/// Trait for resolving a product's current name and price.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Resolves a product reference, or None if the catalog no longer
    /// carries it.
    async fn resolve(&self, product_id: &ProductId)
    -> Result<Option<ProductSnapshot>, CheckoutError>;
}

/// In-memory product catalog for testing and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductCatalog {
    products: Arc<RwLock<HashMap<ProductId, ProductSnapshot>>>,
}

impl InMemoryProductCatalog {
    /// Creates a new empty in-memory catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a product.
    pub fn add_product(
        &self,
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        unit_price: Money,
    ) {
        let product_id = product_id.into();
        self.products.write().unwrap().insert(
            product_id.clone(),
            ProductSnapshot {
                product_id,
                name: name.into(),
                unit_price,
            },
        );
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn resolve(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<ProductSnapshot>, CheckoutError> {
        Ok(self.products.read().unwrap().get(product_id).cloned())
    }
}
