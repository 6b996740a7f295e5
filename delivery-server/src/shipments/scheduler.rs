//! Daily generation scheduler
//!
//! Sleeps until the configured generation time in the business timezone,
//! runs the daily batch for today as `system`, and repeats. On startup it
//! catches up once if today's generation time has already passed. The
//! ledger gate makes extra firings harmless.

use chrono::NaiveTime;
use chrono_tz::Tz;
use tokio_util::sync::CancellationToken;

use super::DailyShipmentGenerator;
use crate::utils::time;

const EXECUTOR: &str = "system";

/// Registered as `TaskKind::Periodic`
pub struct GenerationScheduler {
    generator: DailyShipmentGenerator,
    generation_time: NaiveTime,
    tz: Tz,
    shutdown: CancellationToken,
}

impl GenerationScheduler {
    pub fn new(
        generator: DailyShipmentGenerator,
        generation_time: NaiveTime,
        tz: Tz,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            generator,
            generation_time,
            tz,
            shutdown,
        }
    }

    /// Main loop: startup catch-up, then one run per day at `generation_time`
    pub async fn run(self) {
        tracing::info!(
            generation_time = %self.generation_time.format("%H:%M"),
            timezone = %self.tz,
            "Generation scheduler started"
        );

        let now = chrono::Utc::now().with_timezone(&self.tz);
        if now.time() >= self.generation_time {
            self.generate_today().await;
        }

        loop {
            let sleep_duration = Self::duration_until_next_run(self.generation_time, self.tz);
            tracing::info!(
                "Next shipment generation in {} minutes",
                sleep_duration.as_secs() / 60
            );

            tokio::select! {
                _ = tokio::time::sleep(sleep_duration) => {
                    self.generate_today().await;
                }
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Generation scheduler received shutdown signal");
                    return;
                }
            }
        }
    }

    async fn generate_today(&self) {
        let today = time::today(self.tz);
        match self.generator.generate_for_day(today, EXECUTOR).await {
            Ok(result) => {
                tracing::info!(
                    execution_date = %today,
                    already_ran = result.already_ran,
                    status = result.status.as_str(),
                    "{}",
                    result.message
                );
            }
            Err(e) => {
                // Already recorded as FAILED; the next firing retries
                tracing::error!(execution_date = %today, error = %e, retryable = e.is_retryable(), "Scheduled shipment generation failed");
            }
        }
    }

    /// Duration until the next occurrence of `at` (business timezone)
    pub fn duration_until_next_run(at: NaiveTime, tz: Tz) -> std::time::Duration {
        let now = chrono::Utc::now().with_timezone(&tz);
        let today = now.date_naive();

        let target_date = if now.time() >= at {
            today + chrono::Duration::days(1)
        } else {
            today
        };

        let target_datetime = target_date
            .and_time(at)
            .and_local_timezone(tz)
            .earliest()
            .unwrap_or_else(|| {
                // DST gap: the wall-clock time does not exist that day
                (target_date.and_time(at) + chrono::Duration::hours(1))
                    .and_local_timezone(tz)
                    .latest()
                    .unwrap_or_else(|| {
                        tracing::error!("Cannot resolve local generation time, using fallback");
                        now + chrono::Duration::hours(1)
                    })
            });

        let duration = target_datetime.signed_duration_since(now);
        if duration.num_seconds() <= 0 {
            std::time::Duration::from_secs(60)
        } else {
            duration
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(60))
        }
    }
}
