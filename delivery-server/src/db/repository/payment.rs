//! Payment Repository

use super::RepoResult;
use crate::money;
use shared::models::{Payment, PaymentAllocation};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    client_id: i64,
    payment_code: String,
    amount_paid_cents: i64,
    unallocated_cents: i64,
    payment_date: i64,
    payment_time: Option<String>,
    registered_by: i64,
    created_at: i64,
}

impl PaymentRow {
    fn into_payment(self, allocations: Vec<PaymentAllocation>) -> Payment {
        Payment {
            id: self.id,
            client_id: self.client_id,
            payment_code: self.payment_code,
            amount_paid: money::from_cents(self.amount_paid_cents),
            unallocated_amount: money::from_cents(self.unallocated_cents),
            payment_date: self.payment_date,
            payment_time: self.payment_time,
            registered_by: self.registered_by,
            allocations,
            created_at: self.created_at,
        }
    }
}

/// Payment row to insert (amounts in cents)
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub id: i64,
    pub client_id: i64,
    pub payment_code: String,
    pub amount_paid_cents: i64,
    pub unallocated_cents: i64,
    pub payment_date: i64,
    pub payment_time: Option<String>,
    pub registered_by: i64,
    pub created_at: i64,
}

/// One allocation slice to insert
#[derive(Debug, Clone, Copy)]
pub struct NewAllocation {
    pub shipment_id: i64,
    pub amount_applied_cents: i64,
}

/// Insert a payment and its allocation list on one connection.
///
/// Meant to run inside the allocator's transaction; a taken payment code
/// surfaces as `RepoError::Duplicate`.
pub async fn create(
    conn: &mut SqliteConnection,
    payment: &NewPayment,
    allocations: &[NewAllocation],
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO payment (id, client_id, payment_code, amount_paid_cents, unallocated_cents, payment_date, payment_time, registered_by, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(payment.id)
    .bind(payment.client_id)
    .bind(&payment.payment_code)
    .bind(payment.amount_paid_cents)
    .bind(payment.unallocated_cents)
    .bind(payment.payment_date)
    .bind(&payment.payment_time)
    .bind(payment.registered_by)
    .bind(payment.created_at)
    .execute(&mut *conn)
    .await?;

    for (position, alloc) in allocations.iter().enumerate() {
        sqlx::query(
            "INSERT INTO payment_allocation (payment_id, position, shipment_id, amount_applied_cents) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(payment.id)
        .bind(position as i64)
        .bind(alloc.shipment_id)
        .bind(alloc.amount_applied_cents)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn code_exists(
    conn: impl sqlx::Executor<'_, Database = Sqlite>,
    payment_code: &str,
) -> RepoResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM payment WHERE payment_code = ?")
        .bind(payment_code)
        .fetch_optional(conn)
        .await?;
    Ok(found.is_some())
}

/// Payment hydrated with its allocation list (in allocation order)
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Payment>> {
    let row = sqlx::query_as::<_, PaymentRow>(
        "SELECT id, client_id, payment_code, amount_paid_cents, unallocated_cents, payment_date, payment_time, registered_by, created_at FROM payment WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let slices: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT shipment_id, amount_applied_cents FROM payment_allocation WHERE payment_id = ? ORDER BY position",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    let allocations = slices
        .into_iter()
        .map(|(shipment_id, cents)| PaymentAllocation {
            shipment_id,
            amount_applied: money::from_cents(cents),
        })
        .collect();

    Ok(Some(row.into_payment(allocations)))
}

/// Number of payments recorded for a client
pub async fn count_by_client(pool: &SqlitePool, client_id: i64) -> RepoResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payment WHERE client_id = ?")
        .bind(client_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
