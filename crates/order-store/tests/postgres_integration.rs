//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use common::OrderId;
use domain::{InvoiceId, Money, Order, OrderLine, OrderStatus, UserId};
use order_store::{OrderStore, PostgresOrderStore, Settlement, StoreError};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!("../../../migrations/001_create_orders.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresOrderStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_lines, orders")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOrderStore::new(pool)
}

fn sample_order(user_id: UserId) -> Order {
    Order::from_cart(
        OrderId::new(),
        user_id,
        vec![
            OrderLine::new("PRD-A", "Chamomile tea", 3, Money::from_minor(1000)),
            OrderLine::new("PRD-B", "Lavender oil", 1, Money::from_minor(500)),
        ],
    )
    .unwrap()
}

#[tokio::test]
#[serial]
async fn insert_and_get_round_trip() {
    let store = get_test_store().await;
    let order = sample_order(UserId::new());

    store.insert(&order).await.unwrap();

    let loaded = store.get(order.id()).await.unwrap().unwrap();
    assert_eq!(loaded.id(), order.id());
    assert_eq!(loaded.user_id(), order.user_id());
    assert_eq!(loaded.total().minor(), 3500);
    assert_eq!(loaded.status(), OrderStatus::Pending);
    assert_eq!(loaded.lines(), order.lines());
}

#[tokio::test]
#[serial]
async fn lines_come_back_in_insertion_order() {
    let store = get_test_store().await;
    let lines: Vec<OrderLine> = (0..10)
        .map(|i| OrderLine::new(format!("PRD-{i}"), format!("Product {i}"), 1, Money::from_minor(100)))
        .collect();
    let order = Order::from_cart(OrderId::new(), UserId::new(), lines.clone()).unwrap();

    store.insert(&order).await.unwrap();

    let loaded = store.get(order.id()).await.unwrap().unwrap();
    assert_eq!(loaded.lines(), &lines[..]);
}

#[tokio::test]
#[serial]
async fn insert_rejects_duplicate_id() {
    let store = get_test_store().await;
    let order = sample_order(UserId::new());

    store.insert(&order).await.unwrap();
    let err = store.insert(&order).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateOrder(_)));
}

#[tokio::test]
#[serial]
async fn get_missing_order_returns_none() {
    let store = get_test_store().await;
    assert!(store.get(OrderId::new()).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn assign_invoice_then_find_by_invoice() {
    let store = get_test_store().await;
    let order = sample_order(UserId::new());
    store.insert(&order).await.unwrap();

    let invoice = InvoiceId::new("INV-1");
    store.assign_invoice(order.id(), &invoice).await.unwrap();

    let loaded = store.get_by_invoice(&invoice).await.unwrap().unwrap();
    assert_eq!(loaded.id(), order.id());
    assert_eq!(loaded.invoice_id(), Some(&invoice));
    assert_eq!(loaded.status(), OrderStatus::Pending);
}

#[tokio::test]
#[serial]
async fn assign_invoice_rejects_missing_order() {
    let store = get_test_store().await;
    let err = store
        .assign_invoice(OrderId::new(), &InvoiceId::new("INV-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::OrderNotFound(_)));
}

#[tokio::test]
#[serial]
async fn assign_invoice_rejects_settled_order() {
    let store = get_test_store().await;
    let order = sample_order(UserId::new());
    store.insert(&order).await.unwrap();

    let invoice = InvoiceId::new("INV-1");
    store.assign_invoice(order.id(), &invoice).await.unwrap();
    store
        .settle_by_invoice(&invoice, OrderStatus::Paid)
        .await
        .unwrap();

    let err = store
        .assign_invoice(order.id(), &InvoiceId::new("INV-2"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::OrderNotPending { .. }));
}

#[tokio::test]
#[serial]
async fn settle_is_idempotent_under_duplicate_delivery() {
    let store = get_test_store().await;
    let order = sample_order(UserId::new());
    store.insert(&order).await.unwrap();

    let invoice = InvoiceId::new("INV-1");
    store.assign_invoice(order.id(), &invoice).await.unwrap();

    let first = store
        .settle_by_invoice(&invoice, OrderStatus::Paid)
        .await
        .unwrap();
    assert!(matches!(first, Settlement::Applied(_)));

    let second = store
        .settle_by_invoice(&invoice, OrderStatus::Paid)
        .await
        .unwrap();
    assert!(matches!(second, Settlement::AlreadySettled(_)));
    assert_eq!(second.order().status(), OrderStatus::Paid);

    let contradiction = store
        .settle_by_invoice(&invoice, OrderStatus::Canceled)
        .await
        .unwrap();
    assert!(!contradiction.was_applied());
    assert_eq!(contradiction.order().status(), OrderStatus::Paid);
}

#[tokio::test]
#[serial]
async fn settle_unknown_invoice_is_an_error() {
    let store = get_test_store().await;
    let err = store
        .settle_by_invoice(&InvoiceId::new("INV-MISSING"), OrderStatus::Paid)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::UnknownInvoice(_)));
}

#[tokio::test]
#[serial]
async fn listings_are_newest_first_and_scoped() {
    let store = get_test_store().await;
    let alice = UserId::new();
    let bob = UserId::new();

    for user in [alice, bob, alice] {
        store.insert(&sample_order(user)).await.unwrap();
    }

    let all = store.list_all().await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0].created_at() >= w[1].created_at()));

    let alices = store.list_for_user(alice).await.unwrap();
    assert_eq!(alices.len(), 2);
    assert!(alices.iter().all(|o| o.user_id() == alice));
}
