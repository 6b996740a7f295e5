//! Generation Ledger service
//!
//! Read/append facade over the `shipment_generation` table. Entries are
//! immutable once written.

use chrono::NaiveDate;
use shared::models::{GenerationPage, GenerationQuery, GenerationRun, GenerationRunCreate};
use sqlx::SqlitePool;

use crate::db::repository::generation;
use crate::error::{DeliveryError, DeliveryResult};

/// Largest page size `history` serves
pub const MAX_HISTORY_LIMIT: u32 = 100;

#[derive(Debug, Clone)]
pub struct GenerationLedger {
    pool: SqlitePool,
}

impl GenerationLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Latest SUCCESS/PARTIAL entry for `day`, if the day already ran
    pub async fn latest_completed_for_day(
        &self,
        day: NaiveDate,
    ) -> DeliveryResult<Option<GenerationRun>> {
        Ok(generation::find_latest_completed_for_day(&self.pool, day).await?)
    }

    /// Latest entry of any outcome for `day`
    pub async fn latest_for_day(&self, day: NaiveDate) -> DeliveryResult<Option<GenerationRun>> {
        Ok(generation::find_latest_for_day(&self.pool, day).await?)
    }

    pub async fn append(&self, entry: GenerationRunCreate) -> DeliveryResult<GenerationRun> {
        Ok(generation::append(&self.pool, entry).await?)
    }

    /// Paged history, newest execution first
    pub async fn history(&self, query: &GenerationQuery) -> DeliveryResult<GenerationPage> {
        if let (Some(start), Some(end)) = (query.start_date, query.end_date)
            && start > end
        {
            return Err(DeliveryError::InvalidArgument(format!(
                "start_date {start} is after end_date {end}"
            )));
        }
        if query.limit == 0 || query.limit > MAX_HISTORY_LIMIT {
            return Err(DeliveryError::InvalidArgument(format!(
                "limit must be between 1 and {MAX_HISTORY_LIMIT}, got {}",
                query.limit
            )));
        }
        Ok(generation::history(&self.pool, query).await?)
    }
}
