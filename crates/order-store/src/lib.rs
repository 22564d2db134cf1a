//! Persistence layer for the order aggregate.
//!
//! The `OrderStore` trait is the sole writer of order state. Two
//! implementations are provided: an in-memory store for tests and local
//! runs, and a PostgreSQL store for deployments. Both expose the same
//! atomic conditional update (`settle_by_invoice`) that the webhook
//! reconciler relies on for idempotence.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use store::{OrderStore, Settlement};
