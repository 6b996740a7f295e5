//! Notification background worker
//!
//! Consumes [`Notification`]s from the queue and hands them to a sink.
//! Stops when the queue closes or on shutdown, after draining what is
//! already queued.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::Notification;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SinkError(pub String);

/// Where notifications are dispatched (email, push, chat, ...)
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), SinkError>;
}

/// Default sink: one structured `tracing` event per notification
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), SinkError> {
        let payload =
            serde_json::to_string(notification).map_err(|e| SinkError(e.to_string()))?;
        tracing::info!(target: "notification", kind = notification.kind(), %payload, "Notification");
        Ok(())
    }
}

/// A notification the sink failed to deliver
#[derive(Debug, Clone)]
pub struct DeliveryFailure {
    pub notification: Notification,
    pub error: String,
    /// Unix millis
    pub failed_at: i64,
}

pub struct NotificationWorker<S> {
    sink: S,
    failures: Option<mpsc::Sender<DeliveryFailure>>,
}

impl<S: NotificationSink> NotificationWorker<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            failures: None,
        }
    }

    /// Worker that also forwards sink failures on a bounded channel
    pub fn with_failure_channel(
        sink: S,
        buffer_size: usize,
    ) -> (Self, mpsc::Receiver<DeliveryFailure>) {
        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        let worker = Self {
            sink,
            failures: Some(tx),
        };
        (worker, rx)
    }

    /// Run until the queue closes or `shutdown` fires
    pub async fn run(self, mut rx: mpsc::Receiver<Notification>, shutdown: CancellationToken) {
        tracing::info!("Notification worker started");

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(notification) => self.dispatch(notification).await,
                    None => break,
                },
                _ = shutdown.cancelled() => {
                    rx.close();
                    while let Some(notification) = rx.recv().await {
                        self.dispatch(notification).await;
                    }
                    break;
                }
            }
        }

        tracing::info!("Notification queue closed, worker stopping");
    }

    async fn dispatch(&self, notification: Notification) {
        match self.sink.deliver(&notification).await {
            Ok(()) => {
                tracing::debug!(kind = notification.kind(), "Notification delivered");
            }
            Err(e) => {
                tracing::error!(kind = notification.kind(), error = %e, "Failed to deliver notification");
                if let Some(tx) = &self.failures {
                    let failure = DeliveryFailure {
                        notification,
                        error: e.0,
                        failed_at: shared::util::now_millis(),
                    };
                    if tx.try_send(failure).is_err() {
                        tracing::warn!("Delivery failure channel full or closed, failure not forwarded");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails every other delivery
    struct FlakySink {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl NotificationSink for FlakySink {
        async fn deliver(&self, _notification: &Notification) -> Result<(), SinkError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 1 {
                Err(SinkError(format!("smtp timeout #{n}")))
            } else {
                Ok(())
            }
        }
    }

    fn sample(id: i64) -> Notification {
        Notification::ShipmentGenerated {
            shipment_id: id,
            order_id: 1,
            client_id: 1,
            executed_by: "tester".into(),
        }
    }

    #[tokio::test]
    async fn test_failures_are_forwarded() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (worker, mut failures) = NotificationWorker::with_failure_channel(
            FlakySink {
                calls: calls.clone(),
            },
            8,
        );
        let (tx, rx) = mpsc::channel(8);
        for id in 0..4 {
            tx.send(sample(id)).await.unwrap();
        }
        drop(tx);

        worker.run(rx, CancellationToken::new()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let first = failures.recv().await.unwrap();
        assert_eq!(first.notification, sample(1));
        assert!(first.error.contains("smtp timeout"));
        assert_eq!(failures.recv().await.unwrap().notification, sample(3));
        assert!(failures.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_shutdown_drains_queued_notifications() {
        let calls = Arc::new(AtomicUsize::new(0));
        let worker = NotificationWorker::new(FlakySink {
            calls: calls.clone(),
        });
        let (tx, rx) = mpsc::channel(8);
        tx.send(sample(1)).await.unwrap();
        tx.send(sample(2)).await.unwrap();

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        // sender still alive: only the token can stop the worker
        worker.run(rx, shutdown).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        drop(tx);
    }
}
