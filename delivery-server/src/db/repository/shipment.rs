//! Shipment Repository
//!
//! Inserts are conditional on the `(order_id, delivery_day)` live-row unique
//! index, and paid-amount updates are conditioned on the previously read
//! amount, so neither a generator race nor a payment race can corrupt rows.

use super::RepoResult;
use crate::money;
use shared::models::{DebtSummary, PaymentStatus, Shipment, ShipmentStatus};
use sqlx::{Sqlite, SqlitePool};

const SHIPMENT_COLUMNS: &str = "id, order_id, client_id, delivery_date, delivery_day, billed_amount_cents, amount_paid_cents, payment_status, status, note, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ShipmentRow {
    id: i64,
    order_id: i64,
    client_id: i64,
    delivery_date: i64,
    delivery_day: String,
    billed_amount_cents: i64,
    amount_paid_cents: i64,
    payment_status: PaymentStatus,
    status: ShipmentStatus,
    note: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl From<ShipmentRow> for Shipment {
    fn from(row: ShipmentRow) -> Self {
        Shipment {
            id: row.id,
            order_id: row.order_id,
            client_id: row.client_id,
            delivery_date: row.delivery_date,
            delivery_day: row.delivery_day,
            billed_amount: money::from_cents(row.billed_amount_cents),
            amount_paid: money::from_cents(row.amount_paid_cents),
            payment_status: row.payment_status,
            status: row.status,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// New shipment to insert (amounts already in cents)
#[derive(Debug, Clone)]
pub struct NewShipment {
    pub id: i64,
    pub order_id: i64,
    pub client_id: i64,
    pub delivery_date: i64,
    pub delivery_day: String,
    pub billed_amount_cents: i64,
    pub payment_status: PaymentStatus,
    pub note: Option<String>,
    pub created_at: i64,
}

/// Insert unless a live shipment already exists for (order, day).
///
/// Returns `false` when the unique index swallowed the insert, i.e. another
/// writer got there first. Other constraint failures still error.
pub async fn insert_if_absent(
    conn: impl sqlx::Executor<'_, Database = Sqlite>,
    shipment: &NewShipment,
) -> RepoResult<bool> {
    let result = sqlx::query(
        "INSERT INTO shipment (id, order_id, client_id, delivery_date, delivery_day, billed_amount_cents, amount_paid_cents, payment_status, status, note, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, 'DELIVERED', ?8, ?9, ?9) \
         ON CONFLICT (order_id, delivery_day) WHERE status <> 'CANCELLED' DO NOTHING",
    )
    .bind(shipment.id)
    .bind(shipment.order_id)
    .bind(shipment.client_id)
    .bind(shipment.delivery_date)
    .bind(&shipment.delivery_day)
    .bind(shipment.billed_amount_cents)
    .bind(shipment.payment_status)
    .bind(&shipment.note)
    .bind(shipment.created_at)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn find_by_id(
    conn: impl sqlx::Executor<'_, Database = Sqlite>,
    id: i64,
) -> RepoResult<Option<Shipment>> {
    let sql = format!("SELECT {SHIPMENT_COLUMNS} FROM shipment WHERE id = ?");
    let row = sqlx::query_as::<_, ShipmentRow>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(Shipment::from))
}

/// Live (non-cancelled) shipment of an order with `start <= delivery_date < end`
pub async fn find_active_for_order_in_range(
    conn: impl sqlx::Executor<'_, Database = Sqlite>,
    order_id: i64,
    start: i64,
    end: i64,
) -> RepoResult<Option<Shipment>> {
    let sql = format!(
        "SELECT {SHIPMENT_COLUMNS} FROM shipment WHERE order_id = ? AND delivery_date >= ? AND delivery_date < ? AND status <> 'CANCELLED' ORDER BY id LIMIT 1"
    );
    let row = sqlx::query_as::<_, ShipmentRow>(&sql)
        .bind(order_id)
        .bind(start)
        .bind(end)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(Shipment::from))
}

/// Live UNPAID/INCOMPLETE shipments of a client, oldest delivery first.
///
/// Ties on delivery date fall back to creation time, then id, so the
/// waterfall order is reproducible.
pub async fn find_outstanding_by_client(
    conn: impl sqlx::Executor<'_, Database = Sqlite>,
    client_id: i64,
) -> RepoResult<Vec<Shipment>> {
    let sql = format!(
        "SELECT {SHIPMENT_COLUMNS} FROM shipment WHERE client_id = ? AND payment_status IN ('UNPAID', 'INCOMPLETE') AND status <> 'CANCELLED' ORDER BY delivery_date ASC, created_at ASC, id ASC"
    );
    let rows = sqlx::query_as::<_, ShipmentRow>(&sql)
        .bind(client_id)
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().map(Shipment::from).collect())
}

/// All shipments of a client, newest delivery first
pub async fn find_by_client(pool: &SqlitePool, client_id: i64) -> RepoResult<Vec<Shipment>> {
    let sql = format!(
        "SELECT {SHIPMENT_COLUMNS} FROM shipment WHERE client_id = ? ORDER BY delivery_date DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, ShipmentRow>(&sql)
        .bind(client_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(Shipment::from).collect())
}

/// Set a shipment's paid amount if it still equals `expected_paid_cents`.
///
/// Returns `false` when the row moved underneath us (or the new amount would
/// exceed the billed amount); the caller treats that as a lost race.
pub async fn update_paid_amount(
    conn: impl sqlx::Executor<'_, Database = Sqlite>,
    id: i64,
    expected_paid_cents: i64,
    new_paid_cents: i64,
    payment_status: PaymentStatus,
    now: i64,
) -> RepoResult<bool> {
    let result = sqlx::query(
        "UPDATE shipment SET amount_paid_cents = ?1, payment_status = ?2, updated_at = ?3 \
         WHERE id = ?4 AND amount_paid_cents = ?5 AND ?1 <= billed_amount_cents AND status <> 'CANCELLED'",
    )
    .bind(new_paid_cents)
    .bind(payment_status)
    .bind(now)
    .bind(id)
    .bind(expected_paid_cents)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Outstanding debt of a client (`billed - paid` over UNPAID/INCOMPLETE)
pub async fn debt_summary(pool: &SqlitePool, client_id: i64) -> RepoResult<DebtSummary> {
    let (debt_cents, pending_count): (i64, i64) = sqlx::query_as(
        "SELECT COALESCE(SUM(billed_amount_cents - amount_paid_cents), 0), COUNT(*) FROM shipment \
         WHERE client_id = ? AND payment_status IN ('UNPAID', 'INCOMPLETE') AND status <> 'CANCELLED'",
    )
    .bind(client_id)
    .fetch_one(pool)
    .await?;

    Ok(DebtSummary {
        client_id,
        total_debt: money::from_cents(debt_cents),
        pending_count,
    })
}
