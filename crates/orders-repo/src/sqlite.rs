use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use orders_types::domain::order::{NewOrder, Order, OrderItem, OrderSummary};
use orders_types::domain::pagination::PageRequest;
use orders_types::domain::status::OrderStatus;
use orders_types::ports::order_repository::{OrderRepository, RepoError};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, total_amount, total_items, status, created_at, updated_at";
const COUNT_SQL: &str = "SELECT COUNT(*) FROM orders WHERE (?1 IS NULL OR status = ?1)";

pub struct SqliteRepo {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct DbOrder {
    id: String,
    total_amount: i64,
    total_items: i64,
    status: String,
    created_at: String,
    updated_at: String,
}

#[derive(FromRow)]
struct DbOrderItem {
    id: String,
    order_id: String,
    product_id: String,
    quantity: i64,
    price: i64,
}

fn db_err(e: sqlx::Error) -> RepoError {
    RepoError::Db(e.to_string())
}

fn parse_id(s: &str) -> Result<Uuid, RepoError> {
    Uuid::parse_str(s).map_err(|e| RepoError::Decode(e.to_string()))
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, RepoError> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(|e| RepoError::Decode(e.to_string()))?
        .with_timezone(&Utc))
}

// Fixed-width timestamps keep `ORDER BY created_at` chronological.
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl DbOrder {
    fn into_summary(self) -> Result<OrderSummary, RepoError> {
        let status =
            OrderStatus::from_str(&self.status).map_err(|e| RepoError::Decode(e.to_string()))?;
        Ok(OrderSummary {
            id: parse_id(&self.id)?,
            total_amount: self.total_amount,
            total_items: self.total_items,
            status,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }

    fn into_order(self, items: Vec<DbOrderItem>) -> Result<Order, RepoError> {
        let summary = self.into_summary()?;
        let items = items
            .into_iter()
            .map(DbOrderItem::into_item)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Order {
            id: summary.id,
            total_amount: summary.total_amount,
            total_items: summary.total_items,
            status: summary.status,
            created_at: summary.created_at,
            updated_at: summary.updated_at,
            items,
        })
    }
}

impl DbOrderItem {
    fn into_item(self) -> Result<OrderItem, RepoError> {
        let quantity =
            u32::try_from(self.quantity).map_err(|e| RepoError::Decode(e.to_string()))?;
        Ok(OrderItem {
            id: parse_id(&self.id)?,
            order_id: parse_id(&self.order_id)?,
            product_id: self.product_id,
            quantity,
            price: self.price,
        })
    }
}

impl SqliteRepo {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options).await?;
        tracing::info!(database_url, "sqlite pool connected");
        Self::with_pool(pool).await
    }

    /// Wraps an existing pool, applying the schema first.
    pub async fn with_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        let ddl = include_str!("../migrations/0001_create_orders.sql");
        for stmt in ddl.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(stmt).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    /// Waits for in-flight queries, then closes every connection.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("sqlite pool closed");
    }

    async fn items_for(&self, order_id: &str) -> Result<Vec<DbOrderItem>, RepoError> {
        sqlx::query_as(
            "SELECT id, order_id, product_id, quantity, price FROM order_items
             WHERE order_id = ? ORDER BY rowid",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }
}

#[async_trait]
impl OrderRepository for SqliteRepo {
    async fn create_with_items(&self, order: NewOrder) -> Result<Order, RepoError> {
        let order = Order::from_new(order);
        let order_id = order.id.to_string();

        // Dropping `tx` on any early return rolls the whole order back.
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query(
            "INSERT INTO orders (id, total_amount, total_items, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&order_id)
        .bind(order.total_amount)
        .bind(order.total_items)
        .bind(order.status.as_str())
        .bind(format_ts(order.created_at))
        .bind(format_ts(order.updated_at))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, quantity, price)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(item.id.to_string())
            .bind(&order_id)
            .bind(&item.product_id)
            .bind(i64::from(item.quantity))
            .bind(item.price)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(order)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        let id = id.to_string();
        let row: Option<DbOrder> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
                .bind(&id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let items = self.items_for(&id).await?;
        row.into_order(items).map(Some)
    }

    async fn find_page(&self, page: PageRequest) -> Result<(Vec<OrderSummary>, u64), RepoError> {
        let status = page.status.map(OrderStatus::as_str);

        // Count and page come from the same snapshot.
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let total: i64 = sqlx::query_scalar(COUNT_SQL)
            .bind(status)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;
        let rows: Vec<DbOrder> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE (?1 IS NULL OR status = ?1)
             ORDER BY created_at, id LIMIT ?2 OFFSET ?3"
        ))
        .bind(status)
        .bind(i64::from(page.limit))
        // Offsets past i64::MAX can only land beyond the last row.
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(&mut *tx)
        .await
        .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;

        let data = rows
            .into_iter()
            .map(DbOrder::into_summary)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((data, total.max(0) as u64))
    }

    async fn count_by_status(&self, status: Option<OrderStatus>) -> Result<u64, RepoError> {
        let total: i64 = sqlx::query_scalar(COUNT_SQL)
            .bind(status.map(OrderStatus::as_str))
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(total.max(0) as u64)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepoError> {
        let updated = sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(format_ts(Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }
}
