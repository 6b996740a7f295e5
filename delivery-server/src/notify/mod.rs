//! Typed background notifications
//!
//! Business operations publish [`Notification`]s onto a bounded queue and
//! never wait on delivery. [`NotificationWorker`] drains the queue into a
//! [`NotificationSink`]; sink failures are logged and forwarded on a
//! failure channel so operations tooling can observe them.

pub mod worker;

pub use worker::{DeliveryFailure, LogSink, NotificationSink, NotificationWorker, SinkError};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::GenerationStatus;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A batch generation run finished
    ShipmentsGenerated {
        execution_date: NaiveDate,
        status: GenerationStatus,
        created: usize,
        skipped: usize,
        errors: usize,
        executed_by: String,
    },
    /// A single shipment was generated on demand
    ShipmentGenerated {
        shipment_id: i64,
        order_id: i64,
        client_id: i64,
        executed_by: String,
    },
    /// A payment was applied to a client's shipments
    PaymentAllocated {
        payment_id: i64,
        client_id: i64,
        amount_paid: Decimal,
        unallocated: Decimal,
        shipments: usize,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::ShipmentsGenerated { .. } => "shipments_generated",
            Notification::ShipmentGenerated { .. } => "shipment_generated",
            Notification::PaymentAllocated { .. } => "payment_allocated",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Notification queue is full")]
    QueueFull,
    #[error("Notification queue is closed")]
    QueueClosed,
}

/// Sending half of the notification queue
///
/// Cheap to clone; every clone shares the drop counter.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<Notification>,
    dropped: Arc<AtomicU64>,
}

impl NotificationQueue {
    pub fn new(buffer_size: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        let queue = Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (queue, rx)
    }

    /// Enqueue without waiting. A full or closed queue counts as dropped.
    pub fn submit(&self, notification: Notification) -> Result<(), NotifyError> {
        match self.tx.try_send(notification) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(NotifyError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(NotifyError::QueueClosed)
            }
        }
    }

    /// `submit`, logging a dropped notification at warn
    pub fn publish(&self, notification: Notification) {
        let kind = notification.kind();
        if let Err(e) = self.submit(notification) {
            tracing::warn!(
                kind,
                error = %e,
                dropped_total = self.dropped_count(),
                "Notification dropped"
            );
        }
    }

    /// Notifications that never reached the queue
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: i64) -> Notification {
        Notification::ShipmentGenerated {
            shipment_id: id,
            order_id: 1,
            client_id: 2,
            executed_by: "tester".into(),
        }
    }

    #[tokio::test]
    async fn test_full_queue_is_reported_and_counted() {
        let (queue, mut rx) = NotificationQueue::new(1);
        assert_eq!(queue.submit(sample(1)), Ok(()));
        assert_eq!(queue.submit(sample(2)), Err(NotifyError::QueueFull));
        assert_eq!(queue.dropped_count(), 1);

        assert_eq!(rx.recv().await, Some(sample(1)));
    }

    #[tokio::test]
    async fn test_closed_queue_is_reported() {
        let (queue, rx) = NotificationQueue::new(4);
        drop(rx);
        assert_eq!(queue.submit(sample(1)), Err(NotifyError::QueueClosed));
        queue.publish(sample(2));
        assert_eq!(queue.dropped_count(), 2);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(sample(9)).unwrap();
        assert_eq!(json["type"], "shipment_generated");
        assert_eq!(json["shipment_id"], 9);
    }
}
