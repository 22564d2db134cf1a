//! Checkout and payment reconciliation for the store backend.
//!
//! Three services own the order lifecycle:
//! - `CheckoutService` converts a cart into an immutable priced order
//! - `PaymentService` requests an invoice from the payment provider
//! - `WebhookReconciler` applies the provider's asynchronous outcome
//!
//! The cart, product catalog, and identity collaborators are consumed
//! through narrow traits in [`services`]; the payment provider through
//! [`gateway`].

pub mod checkout;
pub mod error;
pub mod gateway;
pub mod lock;
pub mod payment;
pub mod reconcile;
pub mod services;

pub use checkout::CheckoutService;
pub use error::{CheckoutError, Result};
pub use gateway::{
    BasketLine, GatewayConfig, GatewayError, HttpPaymentGateway, InvoiceReceipt, InvoiceRequest,
    MockPaymentGateway, PaymentGateway,
};
pub use payment::{PaymentRedirect, PaymentService};
pub use reconcile::{PaymentNotification, ReconcileOutcome, WebhookReconciler};
pub use services::{
    CartLine, CartService, IdentityService, InMemoryCartService, InMemoryIdentityService,
    InMemoryProductCatalog, ProductCatalog, ProductSnapshot,
};
