//! Long-running tasks owned by the server process
//!
//! Two kinds run today: the notification worker (drains its queue) and the
//! generation scheduler (wakes once a day). Both observe one shared
//! [`CancellationToken`]; shutdown cancels it and waits up to a grace period
//! so a batch in flight can finish writing its ledger entry.

use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Time allowed for tasks to stop after cancellation before they are aborted
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Consumes a queue until it closes
    Worker,
    /// Sleeps until a wall-clock time
    Periodic,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskKind::Worker => "worker",
            TaskKind::Periodic => "periodic",
        })
    }
}

struct TaskEntry {
    name: &'static str,
    kind: TaskKind,
    handle: JoinHandle<()>,
}

/// Registry of the process's background tasks
///
/// ```ignore
/// let mut tasks = BackgroundTasks::new();
/// let token = tasks.shutdown_token();
/// tasks.spawn("notification_worker", TaskKind::Worker, worker.run(rx, token));
/// // ...
/// tasks.shutdown().await;
/// ```
pub struct BackgroundTasks {
    entries: Vec<TaskEntry>,
    cancel: CancellationToken,
    grace: Duration,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::with_grace(SHUTDOWN_GRACE)
    }

    pub fn with_grace(grace: Duration) -> Self {
        Self {
            entries: Vec::new(),
            cancel: CancellationToken::new(),
            grace,
        }
    }

    /// Clone of the token every task selects on
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawn `future`; a panic is caught and logged instead of tearing the
    /// runtime down, and an exit before shutdown is logged as unexpected.
    pub fn spawn<F>(&mut self, name: &'static str, kind: TaskKind, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(()) if cancel.is_cancelled() => {
                    tracing::debug!(task = name, %kind, "Background task stopped");
                }
                Ok(()) => {
                    tracing::warn!(task = name, %kind, "Background task exited before shutdown");
                }
                Err(payload) => {
                    tracing::error!(task = name, %kind, panic = %panic_message(&*payload), "Background task panicked");
                }
            }
        });
        tracing::debug!(task = name, %kind, "Background task spawned");
        self.entries.push(TaskEntry { name, kind, handle });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn log_summary(&self) {
        let names: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("{} ({})", e.name, e.kind))
            .collect();
        tracing::info!(count = self.entries.len(), tasks = %names.join(", "), "Background tasks running");
    }

    /// Names of tasks that are no longer running
    pub fn finished(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|e| e.handle.is_finished())
            .map(|e| e.name)
            .collect()
    }

    /// Cancel every task and wait for it, aborting those still running when
    /// the grace period runs out
    pub async fn shutdown(self) {
        tracing::info!(count = self.entries.len(), "Stopping background tasks");
        self.cancel.cancel();

        let deadline = tokio::time::Instant::now() + self.grace;
        for mut entry in self.entries {
            match tokio::time::timeout_at(deadline, &mut entry.handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(task = entry.name, error = %e, "Background task failed to join");
                }
                Err(_) => {
                    tracing::warn!(task = entry.name, grace = ?self.grace, "Background task ignored shutdown, aborting");
                    entry.handle.abort();
                }
            }
        }

        tracing::info!("Background tasks stopped");
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_stops_cooperative_tasks() {
        let mut tasks = BackgroundTasks::new();
        let token = tasks.shutdown_token();
        tasks.spawn("idle", TaskKind::Periodic, async move {
            token.cancelled().await;
        });
        assert_eq!(tasks.len(), 1);
        assert!(tasks.finished().is_empty());

        tokio::time::timeout(Duration::from_secs(1), tasks.shutdown())
            .await
            .expect("cooperative task stops once cancelled");
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let mut tasks = BackgroundTasks::new();
        tasks.spawn("boom", TaskKind::Worker, async {
            panic!("worker exploded");
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(tasks.finished(), vec!["boom"]);
        tasks.shutdown().await;
    }

    #[tokio::test]
    async fn test_stuck_task_is_aborted_after_grace() {
        let mut tasks = BackgroundTasks::with_grace(Duration::from_millis(50));
        tasks.spawn("stuck", TaskKind::Periodic, async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });

        tokio::time::timeout(Duration::from_secs(2), tasks.shutdown())
            .await
            .expect("shutdown returns after the grace period");
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(&*boxed), "static message");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*boxed), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*boxed), "non-string panic payload");
    }
}
