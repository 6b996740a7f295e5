//! On-Demand Shipment Generator
//!
//! Point fix for a single order (e.g. an order created after the daily batch
//! ran). Shares the batch's per-order creation step but never reads or
//! writes the generation ledger.

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use shared::models::{Shipment, Weekday};
use sqlx::SqlitePool;

use super::{CreateOutcome, create_for_order};
use crate::db::repository::order;
use crate::error::{DeliveryError, DeliveryResult};
use crate::notify::{Notification, NotificationQueue};
use crate::utils::time;

/// Outcome of `generate_for_order`
#[derive(Debug, Clone, Serialize)]
pub struct SingleGenerationResult {
    pub shipment: Shipment,
    /// The order already had a shipment for the day; it is returned as-is
    pub already_exists: bool,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct OnDemandGenerator {
    pool: SqlitePool,
    tz: Tz,
    notifier: Option<NotificationQueue>,
}

impl OnDemandGenerator {
    pub fn new(pool: SqlitePool, tz: Tz) -> Self {
        Self {
            pool,
            tz,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: NotificationQueue) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Generate today's shipment for one order
    pub async fn generate_for_order(
        &self,
        order_id: i64,
        executed_by: &str,
    ) -> DeliveryResult<SingleGenerationResult> {
        self.generate_for_order_on(order_id, time::today(self.tz), executed_by)
            .await
    }

    /// Generate one order's shipment for an explicit business day
    pub async fn generate_for_order_on(
        &self,
        order_id: i64,
        day: NaiveDate,
        executed_by: &str,
    ) -> DeliveryResult<SingleGenerationResult> {
        let order = order::find_by_id(&self.pool, order_id)
            .await?
            .ok_or_else(|| DeliveryError::not_found("order", order_id))?;

        if !order.is_active {
            return Err(DeliveryError::InactiveOrder {
                order_id,
                order_code: order.order_code,
            });
        }

        let executed_by = if executed_by.trim().is_empty() {
            "admin"
        } else {
            executed_by
        };
        let weekday = Weekday::of(day);
        let note = format!("Generated manually for {weekday} by {executed_by}");

        match create_for_order(&self.pool, &order, day, self.tz, note).await? {
            CreateOutcome::Created(shipment) => {
                tracing::info!(
                    order_id,
                    shipment_id = shipment.id,
                    delivery_day = %day,
                    executed_by,
                    "Shipment generated on demand"
                );
                if let Some(notifier) = &self.notifier {
                    notifier.publish(Notification::ShipmentGenerated {
                        shipment_id: shipment.id,
                        order_id,
                        client_id: shipment.client_id,
                        executed_by: executed_by.to_string(),
                    });
                }
                Ok(SingleGenerationResult {
                    shipment,
                    already_exists: false,
                    message: format!("Shipment generated for {day} ({weekday})"),
                })
            }
            CreateOutcome::Existing(shipment) => {
                tracing::info!(order_id, shipment_id = shipment.id, delivery_day = %day, "Order already has a shipment for the day");
                Ok(SingleGenerationResult {
                    shipment,
                    already_exists: true,
                    message: format!("Order {} already has a shipment for {day}", order.order_code),
                })
            }
        }
    }
}
