//! Daily Shipment Generator
//!
//! Turns a calendar day's eligible recurring orders into shipments, once.
//!
//! 1. Ledger gate: a SUCCESS/PARTIAL entry for the day means it already ran.
//! 2. Fetch active orders scheduled on the day's weekday.
//! 3. Per order: skip if a live shipment exists, otherwise create one.
//!    A failing order is recorded and the batch moves on.
//! 4. Append one ledger entry summarizing the run.
//!
//! A failure of the gate read or the order fetch is fatal: a FAILED entry is
//! written on a best-effort basis and the error is returned. A failure of the
//! final ledger write is logged and swallowed so the caller still gets the
//! outcome.

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use shared::models::{
    GenerationError, GenerationRun, GenerationRunCreate, GenerationStatus, Shipment, Weekday,
};
use sqlx::SqlitePool;

use super::{CreateOutcome, GenerationLedger, create_for_order};
use crate::db::repository::order;
use crate::error::DeliveryResult;
use crate::notify::{Notification, NotificationQueue};

/// Outcome of `generate_for_day`
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub execution_date: NaiveDate,
    /// Eligible orders considered (0 when the day already ran)
    pub total_orders: usize,
    pub created: Vec<Shipment>,
    /// Orders that already had a shipment for the day
    pub skipped: usize,
    pub errors: Vec<GenerationError>,
    /// The day had already been generated; nothing was done
    pub already_ran: bool,
    /// This run's outcome, or the prior run's when `already_ran`
    pub status: GenerationStatus,
    /// Ledger entry written by this run (or the prior one when `already_ran`).
    /// `None` if the ledger write failed.
    pub run: Option<GenerationRun>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DailyShipmentGenerator {
    pool: SqlitePool,
    ledger: GenerationLedger,
    tz: Tz,
    notifier: Option<NotificationQueue>,
}

impl DailyShipmentGenerator {
    pub fn new(pool: SqlitePool, tz: Tz) -> Self {
        let ledger = GenerationLedger::new(pool.clone());
        Self {
            pool,
            ledger,
            tz,
            notifier: None,
        }
    }

    /// Publish a notification after every completed run
    pub fn with_notifier(mut self, notifier: NotificationQueue) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub async fn generate_for_day(
        &self,
        day: NaiveDate,
        executed_by: &str,
    ) -> DeliveryResult<GenerationResult> {
        let executed_by = if executed_by.trim().is_empty() {
            "system"
        } else {
            executed_by
        };

        match self.run(day, executed_by).await {
            Ok(result) => Ok(result),
            Err(e) => {
                tracing::error!(execution_date = %day, executed_by, error = %e, "Shipment generation failed");
                self.record_fatal(day, executed_by, &e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn run(&self, day: NaiveDate, executed_by: &str) -> DeliveryResult<GenerationResult> {
        let weekday = Weekday::of(day);
        tracing::info!(execution_date = %day, %weekday, executed_by, "Starting shipment generation");

        if let Some(prior) = self.ledger.latest_completed_for_day(day).await? {
            let ran_at = chrono::DateTime::from_timestamp_millis(prior.created_at)
                .map(|dt| dt.with_timezone(&self.tz).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| prior.created_at.to_string());
            let message = format!(
                "Shipments for {day} were already generated at {ran_at} ({} created)",
                prior.shipments_created
            );
            tracing::info!(execution_date = %day, prior_run = prior.id, "{}", message);
            return Ok(GenerationResult {
                execution_date: day,
                total_orders: 0,
                created: Vec::new(),
                skipped: 0,
                errors: Vec::new(),
                already_ran: true,
                status: prior.status,
                run: Some(prior),
                message,
            });
        }

        let orders = order::find_active_for_weekday(&self.pool, weekday).await?;
        tracing::info!(execution_date = %day, eligible = orders.len(), "Eligible orders loaded");

        let note = format!("Generated automatically for {weekday}");
        let mut created = Vec::new();
        let mut skipped = 0usize;
        let mut errors = Vec::new();

        for order in &orders {
            match create_for_order(&self.pool, order, day, self.tz, note.clone()).await {
                Ok(CreateOutcome::Created(shipment)) => {
                    tracing::debug!(order_id = order.id, shipment_id = shipment.id, "Shipment created");
                    created.push(shipment);
                }
                Ok(CreateOutcome::Existing(existing)) => {
                    tracing::debug!(order_id = order.id, shipment_id = existing.id, "Shipment already exists, skipping");
                    skipped += 1;
                }
                Err(e) => {
                    tracing::warn!(order_id = order.id, order_code = %order.order_code, error = %e, "Failed to create shipment");
                    errors.push(GenerationError::for_order(
                        order.id,
                        order.order_code.clone(),
                        e.to_string(),
                    ));
                }
            }
        }

        let status = GenerationStatus::from_counts(created.len(), errors.len());
        let entry = GenerationRunCreate {
            execution_date: day,
            total_orders: orders.len() as i64,
            shipments_created: created.len() as i64,
            shipments_skipped: skipped as i64,
            executed_by: executed_by.to_string(),
            status,
            error_details: errors.clone(),
        };
        let run = match self.ledger.append(entry).await {
            Ok(run) => Some(run),
            Err(e) => {
                tracing::error!(execution_date = %day, error = %e, "Failed to record generation run");
                None
            }
        };

        let message = format!(
            "Generated {} shipments for {day} ({skipped} skipped, {} errors)",
            created.len(),
            errors.len()
        );
        tracing::info!(
            execution_date = %day,
            status = status.as_str(),
            created = created.len(),
            skipped,
            errors = errors.len(),
            "Shipment generation finished"
        );

        if let Some(notifier) = &self.notifier {
            notifier.publish(Notification::ShipmentsGenerated {
                execution_date: day,
                status,
                created: created.len(),
                skipped,
                errors: errors.len(),
                executed_by: executed_by.to_string(),
            });
        }

        Ok(GenerationResult {
            execution_date: day,
            total_orders: orders.len(),
            created,
            skipped,
            errors,
            already_ran: false,
            status,
            run,
            message,
        })
    }

    /// Best-effort FAILED entry; a failure here is only logged
    async fn record_fatal(&self, day: NaiveDate, executed_by: &str, message: &str) {
        let entry = GenerationRunCreate {
            execution_date: day,
            total_orders: 0,
            shipments_created: 0,
            shipments_skipped: 0,
            executed_by: executed_by.to_string(),
            status: GenerationStatus::Failed,
            error_details: vec![GenerationError::run_level(message)],
        };
        if let Err(e) = self.ledger.append(entry).await {
            tracing::error!(execution_date = %day, error = %e, "Failed to record failed generation run");
        }
    }
}
