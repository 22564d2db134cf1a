//! API server entry point.

use std::sync::Arc;

use checkout::{
    HttpPaymentGateway, InMemoryCartService, InMemoryIdentityService, InMemoryProductCatalog,
    PaymentGateway,
};
use order_store::{InMemoryOrderStore, OrderStore, PostgresOrderStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve<S, G>(store: S, gateway: G, config: &api::config::Config)
where
    S: OrderStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    // Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // The cart, catalog, and identity collaborators are owned by other
    // services; local runs use the in-memory stand-ins.
    let state = api::build_state(
        store,
        gateway,
        Arc::new(InMemoryCartService::new()),
        Arc::new(InMemoryProductCatalog::new()),
        Arc::new(InMemoryIdentityService::new()),
    );

    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = api::config::Config::from_env();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let gateway =
        HttpPaymentGateway::new(config.gateway.clone()).expect("failed to build gateway client");

    match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(&database_url)
                .await
                .expect("failed to connect to database");
            let store = PostgresOrderStore::new(pool);
            store.run_migrations().await.expect("migrations failed");
            serve(store, gateway, &config).await;
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, using in-memory order store");
            serve(InMemoryOrderStore::new(), gateway, &config).await;
        }
    }
}
