//! Shared fixtures for the integration tests
//!
//! Each test gets its own SQLite file in a temp dir, migrated on open.

#![allow(dead_code)]

use chrono::NaiveDate;
use delivery_server::db::repository::{client, order};
use delivery_server::{Config, ServerState};
use rust_decimal::Decimal;
use shared::models::{ClientCreate, Order, OrderCreate, Weekday};
use tempfile::TempDir;
use tokio::sync::mpsc;

use delivery_server::notify::Notification;

pub struct TestEnv {
    pub state: ServerState,
    pub rx: mpsc::Receiver<Notification>,
    // Keeps the database file alive for the test's duration
    _dir: TempDir,
}

pub async fn setup() -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("delivery.db");
    let mut config = Config::with_database_path(path.to_string_lossy().to_string());
    config.timezone = chrono_tz::Europe::Madrid;
    config.enable_scheduler = false;
    config.db_max_connections = 8;

    let (state, rx) = ServerState::initialize(&config).await.unwrap();
    TestEnv {
        state,
        rx,
        _dir: dir,
    }
}

pub fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub async fn seed_client(env: &TestEnv, name: &str) -> i64 {
    client::create(
        &env.state.db.pool,
        ClientCreate {
            full_name: name.to_string(),
            phone: None,
            address: None,
        },
    )
    .await
    .unwrap()
    .id
}

pub async fn seed_order(
    env: &TestEnv,
    client_id: i64,
    code: &str,
    weekdays: Vec<Weekday>,
    amount: &str,
) -> Order {
    order::create(
        &env.state.db.pool,
        OrderCreate {
            order_code: code.to_string(),
            client_id,
            weekdays,
            amount: d(amount),
            description: None,
            is_active: None,
        },
    )
    .await
    .unwrap()
}

/// Number of live shipments for (order, day)
pub async fn live_shipments(env: &TestEnv, order_id: i64, day: NaiveDate) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM shipment WHERE order_id = ?1 AND delivery_day = ?2 AND status <> 'CANCELLED'",
    )
    .bind(order_id)
    .bind(day.format("%Y-%m-%d").to_string())
    .fetch_one(&env.state.db.pool)
    .await
    .unwrap()
}
