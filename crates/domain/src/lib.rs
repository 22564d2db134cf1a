//! Domain layer for the store backend.
//!
//! This crate provides the core order model:
//! - Order aggregate frozen at checkout time
//! - OrderLine value objects with captured unit prices
//! - OrderStatus state machine and payment outcome mapping
//! - Money in minor currency units

pub mod order;

pub use order::{
    InvoiceId, Money, Order, OrderError, OrderLine, OrderStatus, PaymentOutcome, ProductId, UserId,
};
