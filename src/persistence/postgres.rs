use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{ListFilter, OrderPage, OrderRepository, RepositoryError};
use crate::domain::order::{Order, OrderItem, OrderStatus};

// ============================================================================
// Postgres Order Repository
// ============================================================================
//
// Table layout:
//   orders(id, customer_id, items JSONB, status, total NUMERIC, version,
//          created_at, updated_at, deleted_at)
//
// Items live inline as JSONB; they are always replaced wholesale so a
// child table buys nothing. Soft-deleted rows stay in the table with
// `deleted_at` set and are filtered out of every read.
//
// ============================================================================

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id          UUID PRIMARY KEY,
        customer_id TEXT NOT NULL,
        items       JSONB NOT NULL,
        status      TEXT NOT NULL,
        total       NUMERIC NOT NULL,
        version     BIGINT NOT NULL CHECK (version > 0),
        created_at  TIMESTAMPTZ NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL,
        deleted_at  TIMESTAMPTZ NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_orders_customer_id ON orders (customer_id) WHERE deleted_at IS NULL",
    "CREATE INDEX IF NOT EXISTS idx_orders_status ON orders (status) WHERE deleted_at IS NULL",
    "CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders (created_at DESC)",
];

const COLUMNS: &str = "id, customer_id, items, status, total, version, created_at, updated_at, deleted_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    customer_id: String,
    items: Json<Vec<OrderItem>>,
    status: String,
    total: Decimal,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row
            .status
            .parse()
            .with_context(|| format!("order {} has unknown status in storage", row.id))
            .map_err(RepositoryError::Backend)?;

        Ok(Order {
            id: row.id,
            version: row.version,
            customer_id: row.customer_id,
            items: row.items.0,
            status,
            total: row.total,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        tracing::info!(max_connections, "✅ Connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Create the orders table and its indexes if missing. Idempotent.
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to apply orders schema")?;
        }
        tracing::debug!("orders schema ready");
        Ok(())
    }

    async fn fetch_page(
        &self,
        customer_id: Option<&str>,
        filter: &ListFilter,
        limit: i64,
        offset: i64,
    ) -> Result<OrderPage, RepositoryError> {
        let status = filter.status.map(|s| s.as_str());

        let total_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE deleted_at IS NULL
              AND ($1::TEXT IS NULL OR customer_id = $1)
              AND ($2::TEXT IS NULL OR status = $2)
            "#,
        )
        .bind(customer_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {COLUMNS} FROM orders
            WHERE deleted_at IS NULL
              AND ($1::TEXT IS NULL OR customer_id = $1)
              AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(customer_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let orders = rows.into_iter().map(Order::try_from).collect::<Result<Vec<_>, _>>()?;
        Ok(OrderPage { orders, total_count })
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn create(&self, order: Order) -> Result<Order, RepositoryError> {
        let result = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders (id, customer_id, items, status, total, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 1, $6, $7)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(order.id)
        .bind(&order.customer_id)
        .bind(Json(&order.items))
        .bind(order.status.as_str())
        .bind(order.total)
        .bind(order.created_at)
        .bind(order.updated_at)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => row.try_into(),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(RepositoryError::Conflict(order.id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Order, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM orders WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound(id))?.try_into()
    }

    async fn update(&self, order: Order) -> Result<Order, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            r#"
            UPDATE orders
            SET customer_id = $3, items = $4, status = $5, total = $6,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2 AND deleted_at IS NULL
            RETURNING {COLUMNS}
            "#
        ))
        .bind(order.id)
        .bind(order.version)
        .bind(&order.customer_id)
        .bind(Json(&order.items))
        .bind(order.status.as_str())
        .bind(order.total)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return row.try_into();
        }

        // Zero rows: tell a missing order apart from a stale version
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(order.id)
        .fetch_one(&self.pool)
        .await?;

        if exists {
            Err(RepositoryError::ConcurrentModification {
                id: order.id,
                expected_version: order.version,
            })
        } else {
            Err(RepositoryError::NotFound(order.id))
        }
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET deleted_at = NOW(), updated_at = NOW(), version = version + 1
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }

    async fn list(&self, filter: &ListFilter, limit: i64, offset: i64) -> Result<OrderPage, RepositoryError> {
        self.fetch_page(None, filter, limit, offset).await
    }

    async fn list_by_customer(
        &self,
        customer_id: &str,
        filter: &ListFilter,
        limit: i64,
        offset: i64,
    ) -> Result<OrderPage, RepositoryError> {
        self.fetch_page(Some(customer_id), filter, limit, offset).await
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
