use async_trait::async_trait;
use common::OrderId;
use domain::{InvoiceId, Money, Order, OrderLine, OrderStatus, ProductId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{OrderStore, Settlement},
};

/// PostgreSQL-backed order store.
///
/// Orders and their lines live in two tables written inside one
/// transaction; the settlement guard is a conditional UPDATE so the
/// `Pending` check and the status write are a single statement.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: &PgRow, lines: Vec<OrderLine>) -> Result<Order> {
        let status_str: String = row.try_get("status")?;
        let status = OrderStatus::parse(&status_str)
            .ok_or_else(|| StoreError::InvalidStatus(status_str.clone()))?;

        Ok(Order::rehydrate(
            OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            lines,
            Money::from_minor(row.try_get("total_minor")?),
            status,
            row.try_get::<Option<String>, _>("invoice_id")?
                .map(InvoiceId::new),
            row.try_get("created_at")?,
        ))
    }

    async fn load_lines<'e, E>(executor: E, order_id: OrderId) -> Result<Vec<OrderLine>>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let rows = sqlx::query(
            r#"
            SELECT product_id, product_name, quantity, unit_price_minor
            FROM order_lines
            WHERE order_id = $1
            ORDER BY position
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(executor)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(OrderLine {
                    product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
                    product_name: row.try_get("product_name")?,
                    quantity: row.try_get::<i32, _>("quantity")? as u32,
                    unit_price: Money::from_minor(row.try_get("unit_price_minor")?),
                })
            })
            .collect()
    }

    async fn load_order(&self, row: PgRow) -> Result<Order> {
        let order_id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
        let lines = Self::load_lines(&self.pool, order_id).await?;
        Self::row_to_order(&row, lines)
    }

    async fn load_order_list(&self, rows: Vec<PgRow>) -> Result<Vec<Order>> {
        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(self.load_order(row).await?);
        }
        Ok(orders)
    }
}

const SELECT_ORDER: &str =
    "SELECT id, user_id, total_minor, status, invoice_id, created_at FROM orders";

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn insert(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, total_minor, status, invoice_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.user_id().as_uuid())
        .bind(order.total().minor())
        .bind(order.status().as_str())
        .bind(order.invoice_id().map(InvoiceId::as_str))
        .bind(order.created_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("orders_pkey")
            {
                return StoreError::DuplicateOrder(order.id());
            }
            StoreError::Database(e)
        })?;

        for (position, line) in order.lines().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, position, product_id, product_name, quantity, unit_price_minor)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order.id().as_uuid())
            .bind(position as i32)
            .bind(line.product_id.as_str())
            .bind(&line.product_name)
            .bind(line.quantity as i32)
            .bind(line.unit_price.minor())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("{SELECT_ORDER} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.load_order(row).await?)),
            None => Ok(None),
        }
    }

    async fn get_by_invoice(&self, invoice_id: &InvoiceId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("{SELECT_ORDER} WHERE invoice_id = $1"))
            .bind(invoice_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.load_order(row).await?)),
            None => Ok(None),
        }
    }

    async fn assign_invoice(&self, id: OrderId, invoice_id: &InvoiceId) -> Result<()> {
        let result = sqlx::query(
            "UPDATE orders SET invoice_id = $2 WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(id.as_uuid())
        .bind(invoice_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_order_invoice")
            {
                return StoreError::DuplicateInvoice(invoice_id.clone());
            }
            StoreError::Database(e)
        })?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // No row matched: the order is missing, or a settlement raced in.
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match status {
            None => Err(StoreError::OrderNotFound(id)),
            Some(s) => Err(StoreError::OrderNotPending {
                order_id: id,
                status: OrderStatus::parse(&s).ok_or(StoreError::InvalidStatus(s))?,
            }),
        }
    }

    async fn settle_by_invoice(
        &self,
        invoice_id: &InvoiceId,
        target: OrderStatus,
    ) -> Result<Settlement> {
        // Single-statement compare-and-set on the status column.
        let row = sqlx::query(
            "UPDATE orders SET status = $2 WHERE invoice_id = $1 AND status = 'PENDING' \
             RETURNING id, user_id, total_minor, status, invoice_id, created_at",
        )
        .bind(invoice_id.as_str())
        .bind(target.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(Settlement::Applied(self.load_order(row).await?));
        }

        match self.get_by_invoice(invoice_id).await? {
            Some(order) => Ok(Settlement::AlreadySettled(order)),
            None => Err(StoreError::UnknownInvoice(invoice_id.clone())),
        }
    }

    async fn list_all(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!("{SELECT_ORDER} ORDER BY created_at DESC"))
            .fetch_all(&self.pool)
            .await?;
        self.load_order_list(rows).await
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "{SELECT_ORDER} WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        self.load_order_list(rows).await
    }
}
