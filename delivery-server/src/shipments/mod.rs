//! Shipment generation
//!
//! - [`DailyShipmentGenerator`]: materializes a calendar day's shipments from
//!   recurring order schedules, gated by the [`GenerationLedger`]
//! - [`OnDemandGenerator`]: the same creation step for one order, outside the
//!   ledger
//! - [`GenerationScheduler`]: fires the daily batch at the configured time

pub mod generator;
pub mod ledger;
pub mod on_demand;
pub mod scheduler;

pub use generator::{DailyShipmentGenerator, GenerationResult};
pub use ledger::GenerationLedger;
pub use on_demand::{OnDemandGenerator, SingleGenerationResult};
pub use scheduler::GenerationScheduler;

use chrono::NaiveDate;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use shared::models::{Order, PaymentStatus, Shipment, ShipmentStatus};
use sqlx::SqlitePool;

use crate::db::repository::shipment::{self, NewShipment};
use crate::error::{ConflictKind, DeliveryError, DeliveryResult};
use crate::money;
use crate::utils::time;

/// Result of the per-order creation step
#[derive(Debug)]
pub(crate) enum CreateOutcome {
    Created(Shipment),
    /// A live shipment for (order, day) was already there
    Existing(Shipment),
}

/// Create the shipment of `order` for `day` unless one already exists.
///
/// The pre-check is an early exit; the insert itself is conditional on the
/// live-row unique index, so a concurrent creator makes this return the
/// winner's row as `Existing` instead of a duplicate.
pub(crate) async fn create_for_order(
    pool: &SqlitePool,
    order: &Order,
    day: NaiveDate,
    tz: Tz,
    note: String,
) -> DeliveryResult<CreateOutcome> {
    if order.amount < Decimal::ZERO {
        return Err(DeliveryError::InvalidArgument(format!(
            "Order {} has a negative amount ({})",
            order.order_code, order.amount
        )));
    }
    let billed_amount_cents = money::to_cents(order.amount)?;

    let (start, end) = time::day_range_millis(day, tz);
    if let Some(existing) =
        shipment::find_active_for_order_in_range(pool, order.id, start, end).await?
    {
        return Ok(CreateOutcome::Existing(existing));
    }

    let now = shared::util::now_millis();
    let payment_status = PaymentStatus::from_amounts(order.amount, Decimal::ZERO);
    let new = NewShipment {
        id: shared::util::snowflake_id(),
        order_id: order.id,
        client_id: order.client_id,
        delivery_date: time::delivery_instant(day, now, tz),
        delivery_day: time::day_key(day),
        billed_amount_cents,
        payment_status,
        note: Some(note),
        created_at: now,
    };

    if shipment::insert_if_absent(pool, &new).await? {
        return Ok(CreateOutcome::Created(Shipment {
            id: new.id,
            order_id: new.order_id,
            client_id: new.client_id,
            delivery_date: new.delivery_date,
            delivery_day: new.delivery_day,
            billed_amount: money::from_cents(billed_amount_cents),
            amount_paid: Decimal::ZERO,
            payment_status,
            status: ShipmentStatus::Delivered,
            note: new.note,
            created_at: now,
            updated_at: now,
        }));
    }

    // Lost the race: the winner's row is there now
    tracing::debug!(order_id = order.id, day = %day, "Shipment created concurrently, using existing row");
    shipment::find_active_for_order_in_range(pool, order.id, start, end)
        .await?
        .map(CreateOutcome::Existing)
        .ok_or_else(|| DeliveryError::Conflict {
            kind: ConflictKind::Duplicate,
            message: format!(
                "Shipment for order {} on {} conflicted but could not be read back",
                order.order_code, day
            ),
        })
}
