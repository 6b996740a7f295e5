//! Generation Ledger Repository
//!
//! Append-only: the table carries triggers rejecting UPDATE and DELETE, and
//! this module exposes no mutation besides `append`.

use super::{RepoError, RepoResult};
use crate::utils::time::day_key;
use chrono::NaiveDate;
use shared::models::{
    GenerationError, GenerationPage, GenerationQuery, GenerationRun, GenerationRunCreate,
    GenerationStatus,
};
use sqlx::{Sqlite, SqlitePool};

const GENERATION_COLUMNS: &str = "id, execution_date, total_orders, shipments_created, shipments_skipped, error_count, executed_by, status, error_details, created_at";

#[derive(Debug, sqlx::FromRow)]
struct GenerationRow {
    id: i64,
    execution_date: String,
    total_orders: i64,
    shipments_created: i64,
    shipments_skipped: i64,
    error_count: i64,
    executed_by: String,
    status: GenerationStatus,
    error_details: String,
    created_at: i64,
}

impl TryFrom<GenerationRow> for GenerationRun {
    type Error = RepoError;

    fn try_from(row: GenerationRow) -> Result<Self, Self::Error> {
        let execution_date = NaiveDate::parse_from_str(&row.execution_date, "%Y-%m-%d")
            .map_err(|e| {
                RepoError::Database(format!(
                    "Corrupt execution_date '{}': {e}",
                    row.execution_date
                ))
            })?;
        let error_details: Vec<GenerationError> = serde_json::from_str(&row.error_details)?;
        Ok(GenerationRun {
            id: row.id,
            execution_date,
            total_orders: row.total_orders,
            shipments_created: row.shipments_created,
            shipments_skipped: row.shipments_skipped,
            error_count: row.error_count,
            executed_by: row.executed_by,
            status: row.status,
            error_details,
            created_at: row.created_at,
        })
    }
}

/// Latest entry for a day whose status blocks a rerun (SUCCESS/PARTIAL)
pub async fn find_latest_completed_for_day(
    pool: &SqlitePool,
    day: NaiveDate,
) -> RepoResult<Option<GenerationRun>> {
    let blocking: Vec<GenerationStatus> = GenerationStatus::ALL
        .into_iter()
        .filter(GenerationStatus::blocks_rerun)
        .collect();
    let placeholders = vec!["?"; blocking.len()].join(", ");
    let sql = format!(
        "SELECT {GENERATION_COLUMNS} FROM shipment_generation WHERE execution_date = ? AND status IN ({placeholders}) ORDER BY created_at DESC, id DESC LIMIT 1"
    );
    let mut query = sqlx::query_as::<_, GenerationRow>(&sql).bind(day_key(day));
    for status in blocking {
        query = query.bind(status);
    }
    let row = query.fetch_optional(pool).await?;
    row.map(GenerationRun::try_from).transpose()
}

/// Latest entry of any outcome for a day
pub async fn find_latest_for_day(
    pool: &SqlitePool,
    day: NaiveDate,
) -> RepoResult<Option<GenerationRun>> {
    let sql = format!(
        "SELECT {GENERATION_COLUMNS} FROM shipment_generation WHERE execution_date = ? ORDER BY created_at DESC, id DESC LIMIT 1"
    );
    let row = sqlx::query_as::<_, GenerationRow>(&sql)
        .bind(day_key(day))
        .fetch_optional(pool)
        .await?;
    row.map(GenerationRun::try_from).transpose()
}

pub async fn append(
    conn: impl sqlx::Executor<'_, Database = Sqlite>,
    entry: GenerationRunCreate,
) -> RepoResult<GenerationRun> {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    let error_count = entry.error_details.len() as i64;
    let details_json = serde_json::to_string(&entry.error_details)?;

    sqlx::query(
        "INSERT INTO shipment_generation (id, execution_date, total_orders, shipments_created, shipments_skipped, error_count, executed_by, status, error_details, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )
    .bind(id)
    .bind(day_key(entry.execution_date))
    .bind(entry.total_orders)
    .bind(entry.shipments_created)
    .bind(entry.shipments_skipped)
    .bind(error_count)
    .bind(&entry.executed_by)
    .bind(entry.status)
    .bind(&details_json)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(GenerationRun {
        id,
        execution_date: entry.execution_date,
        total_orders: entry.total_orders,
        shipments_created: entry.shipments_created,
        shipments_skipped: entry.shipments_skipped,
        error_count,
        executed_by: entry.executed_by,
        status: entry.status,
        error_details: entry.error_details,
        created_at: now,
    })
}

/// Paged history, newest execution first, with the total matching count
pub async fn history(pool: &SqlitePool, query: &GenerationQuery) -> RepoResult<GenerationPage> {
    let start = query.start_date.map(day_key);
    let end = query.end_date.map(day_key);
    let limit = i64::from(query.limit.max(1));
    let offset = i64::from(query.page.max(1) - 1)
        .checked_mul(limit)
        .ok_or_else(|| RepoError::Validation(format!("page {} is out of range", query.page)))?;

    const FILTER: &str = "WHERE (?1 IS NULL OR execution_date >= ?1) AND (?2 IS NULL OR execution_date <= ?2) AND (?3 IS NULL OR status = ?3)";

    let sql = format!(
        "SELECT {GENERATION_COLUMNS} FROM shipment_generation {FILTER} ORDER BY execution_date DESC, created_at DESC, id DESC LIMIT ?4 OFFSET ?5"
    );
    let rows = sqlx::query_as::<_, GenerationRow>(&sql)
        .bind(&start)
        .bind(&end)
        .bind(query.status)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM shipment_generation {FILTER}"
    ))
    .bind(&start)
    .bind(&end)
    .bind(query.status)
    .fetch_one(pool)
    .await?;

    let generations = rows
        .into_iter()
        .map(GenerationRun::try_from)
        .collect::<RepoResult<Vec<_>>>()?;

    Ok(GenerationPage { generations, total })
}
