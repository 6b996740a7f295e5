use shared::error::AppError;
use tokio::sync::mpsc;

use crate::core::{BackgroundTasks, Config, TaskKind};
use crate::db::DbService;
use crate::notify::{LogSink, Notification, NotificationQueue, NotificationWorker};
use crate::payments::PaymentAllocator;
use crate::shipments::{
    DailyShipmentGenerator, GenerationLedger, GenerationScheduler, OnDemandGenerator,
};

/// Server state - shared handles every service is built from
///
/// Cheap to clone (pool and queue are reference-counted).
///
/// | Field | Description |
/// |-------|-------------|
/// | config | Configuration (immutable) |
/// | db | SQLite pool, opened at startup and closed at shutdown |
/// | notifier | Sending half of the notification queue |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: DbService,
    pub notifier: NotificationQueue,
}

impl ServerState {
    /// Open the database and create the notification queue.
    ///
    /// Returns the queue's receiving half for the notification worker.
    pub async fn initialize(
        config: &Config,
    ) -> Result<(Self, mpsc::Receiver<Notification>), AppError> {
        let db = DbService::new(config).await?;
        let (notifier, rx) = NotificationQueue::new(config.notify_buffer_size);
        let state = Self {
            config: config.clone(),
            db,
            notifier,
        };
        Ok((state, rx))
    }

    pub fn daily_generator(&self) -> DailyShipmentGenerator {
        DailyShipmentGenerator::new(self.db.pool.clone(), self.config.timezone)
            .with_notifier(self.notifier.clone())
    }

    pub fn on_demand_generator(&self) -> OnDemandGenerator {
        OnDemandGenerator::new(self.db.pool.clone(), self.config.timezone)
            .with_notifier(self.notifier.clone())
    }

    pub fn payment_allocator(&self) -> PaymentAllocator {
        PaymentAllocator::new(self.db.pool.clone()).with_notifier(self.notifier.clone())
    }

    pub fn generation_ledger(&self) -> GenerationLedger {
        GenerationLedger::new(self.db.pool.clone())
    }

    /// Spawn the notification worker and, when enabled, the scheduler
    pub fn start_background_tasks(
        &self,
        rx: mpsc::Receiver<Notification>,
        tasks: &mut BackgroundTasks,
    ) {
        let shutdown = tasks.shutdown_token();

        let worker = NotificationWorker::new(LogSink);
        tasks.spawn(
            "notification_worker",
            TaskKind::Worker,
            worker.run(rx, shutdown.clone()),
        );

        if self.config.enable_scheduler {
            let scheduler = GenerationScheduler::new(
                self.daily_generator(),
                self.config.generation_time,
                self.config.timezone,
                shutdown,
            );
            tasks.spawn("generation_scheduler", TaskKind::Periodic, scheduler.run());
        } else {
            tracing::info!("Generation scheduler disabled (ENABLE_SCHEDULER=false)");
        }

        tasks.log_summary();
    }
}
