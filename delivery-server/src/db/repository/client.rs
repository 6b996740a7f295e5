//! Client Repository
//!
//! Client management lives elsewhere; the core only needs existence checks.
//! `create` exists for seeding and tests.

use super::RepoResult;
use shared::models::{Client, ClientCreate};
use sqlx::SqlitePool;

pub async fn exists(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM client WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

pub async fn create(pool: &SqlitePool, data: ClientCreate) -> RepoResult<Client> {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO client (id, full_name, phone, address, is_active, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
    )
    .bind(id)
    .bind(&data.full_name)
    .bind(&data.phone)
    .bind(&data.address)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Client {
        id,
        full_name: data.full_name,
        phone: data.phone,
        address: data.address,
        is_active: true,
        created_at: now,
        updated_at: now,
    })
}
