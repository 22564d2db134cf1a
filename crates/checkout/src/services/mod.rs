//! External collaborator traits and in-memory implementations.
//!
//! The cart, the product catalog, and the identity provider are owned
//! elsewhere; this module holds the narrow interfaces the checkout core
//! consumes them through.

pub mod cart;
pub mod catalog;
pub mod identity;

pub use cart::{CartLine, CartService, InMemoryCartService};
pub use catalog::{InMemoryProductCatalog, ProductCatalog, ProductSnapshot};
pub use identity::{IdentityService, InMemoryIdentityService};
