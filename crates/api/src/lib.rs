//! HTTP API server with observability for the store backend.
//!
//! Provides REST endpoints for checkout, payment requests, and webhook
//! reconciliation, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use checkout::{
    CartService, CheckoutService, IdentityService, InMemoryCartService, InMemoryIdentityService,
    InMemoryProductCatalog, MockPaymentGateway, PaymentGateway, PaymentService, ProductCatalog,
    WebhookReconciler,
};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryOrderStore, OrderStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, G>(state: Arc<AppState<S, G>>, metrics_handle: PrometheusHandle) -> Router
where
    S: OrderStore + 'static,
    G: PaymentGateway + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders/create", post(routes::orders::create::<S, G>))
        .route("/orders/pay", post(routes::orders::pay::<S, G>))
        .route("/orders/webhook", post(routes::orders::webhook::<S, G>))
        .route("/orders", get(routes::orders::list::<S, G>))
        .route("/orders/my-history", get(routes::orders::my_history::<S, G>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Assembles the services and shared state over the given store,
/// gateway, and collaborator implementations.
pub fn build_state<S, G>(
    store: S,
    gateway: G,
    cart: Arc<dyn CartService>,
    catalog: Arc<dyn ProductCatalog>,
    identity: Arc<dyn IdentityService>,
) -> Arc<AppState<S, G>>
where
    S: OrderStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    Arc::new(AppState {
        checkout: CheckoutService::new(store.clone(), cart, catalog, identity.clone()),
        payments: PaymentService::new(store.clone(), gateway),
        reconciler: WebhookReconciler::new(store.clone()),
        store,
        identity,
    })
}

/// In-memory collaborators wired into the default state.
///
/// Handed back to the caller so tests and local runs can seed users,
/// products, and carts, and steer the mock gateway.
#[derive(Clone)]
pub struct Collaborators {
    pub cart: InMemoryCartService,
    pub catalog: InMemoryProductCatalog,
    pub identity: InMemoryIdentityService,
    pub gateway: MockPaymentGateway,
}

impl Collaborators {
    fn new() -> Self {
        Self {
            cart: InMemoryCartService::new(),
            catalog: InMemoryProductCatalog::new(),
            identity: InMemoryIdentityService::new(),
            gateway: MockPaymentGateway::new(),
        }
    }
}

/// Creates application state over a store with in-memory collaborators
/// and a mock payment gateway.
pub fn create_default_state<S: OrderStore + Clone + 'static>(
    store: S,
) -> (Arc<AppState<S, MockPaymentGateway>>, Collaborators) {
    let collaborators = Collaborators::new();
    let state = build_state(
        store,
        collaborators.gateway.clone(),
        Arc::new(collaborators.cart.clone()),
        Arc::new(collaborators.catalog.clone()),
        Arc::new(collaborators.identity.clone()),
    );
    (state, collaborators)
}

/// Convenience: default in-memory state for local runs without a database.
pub fn create_in_memory_state() -> (
    Arc<AppState<InMemoryOrderStore, MockPaymentGateway>>,
    Collaborators,
) {
    create_default_state(InMemoryOrderStore::new())
}
