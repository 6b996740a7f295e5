//! Order Repository
//!
//! Read side of the order source. Weekday sets are hydrated in the same
//! statement via `group_concat`, so listing orders is a single query.

use super::{RepoError, RepoResult};
use crate::money;
use shared::models::{Order, OrderCreate, Weekday};
use sqlx::SqlitePool;

const ORDER_SELECT: &str = "SELECT o.id, o.order_code, o.client_id, o.amount_cents, o.description, o.is_active, o.created_at, o.updated_at, (SELECT group_concat(d.weekday) FROM order_day d WHERE d.order_id = o.id) AS weekdays FROM orders o";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    order_code: String,
    client_id: i64,
    amount_cents: i64,
    description: Option<String>,
    is_active: bool,
    created_at: i64,
    updated_at: i64,
    weekdays: Option<String>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        let mut weekdays: Vec<Weekday> = row
            .weekdays
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter_map(Weekday::parse)
            .collect();
        weekdays.sort();
        Order {
            id: row.id,
            order_code: row.order_code,
            client_id: row.client_id,
            weekdays,
            amount: money::from_cents(row.amount_cents),
            description: row.description,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Active orders scheduled on `weekday`, hydrated, in creation order
pub async fn find_active_for_weekday(pool: &SqlitePool, weekday: Weekday) -> RepoResult<Vec<Order>> {
    let sql = format!(
        "{ORDER_SELECT} WHERE o.is_active = 1 AND EXISTS (SELECT 1 FROM order_day d WHERE d.order_id = o.id AND d.weekday = ?) ORDER BY o.id"
    );
    let rows = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(weekday)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(Order::from).collect())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let sql = format!("{ORDER_SELECT} WHERE o.id = ?");
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Order::from))
}

/// Insert an order with its weekday set (seeding and tests)
pub async fn create(pool: &SqlitePool, data: OrderCreate) -> RepoResult<Order> {
    if data.order_code.trim().is_empty() {
        return Err(RepoError::Validation("order_code is required".into()));
    }
    let amount_cents = money::to_cents(data.amount)?;
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    let is_active = data.is_active.unwrap_or(true);

    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO orders (id, order_code, client_id, amount_cents, description, is_active, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
    )
    .bind(id)
    .bind(&data.order_code)
    .bind(data.client_id)
    .bind(amount_cents)
    .bind(&data.description)
    .bind(is_active)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for day in &data.weekdays {
        sqlx::query("INSERT OR IGNORE INTO order_day (order_id, weekday) VALUES (?, ?)")
            .bind(id)
            .bind(day)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create order".into()))
}

pub async fn set_active(pool: &SqlitePool, id: i64, is_active: bool) -> RepoResult<()> {
    let rows = sqlx::query("UPDATE orders SET is_active = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(is_active)
        .bind(shared::util::now_millis())
        .bind(id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("order {id}")));
    }
    Ok(())
}
