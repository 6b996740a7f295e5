//! Generation Ledger Model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Outcome of one generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum GenerationStatus {
    Success,
    Partial,
    Failed,
}

impl GenerationStatus {
    pub const ALL: [GenerationStatus; 3] = [
        GenerationStatus::Success,
        GenerationStatus::Partial,
        GenerationStatus::Failed,
    ];

    /// SUCCESS without errors, PARTIAL when something was created despite
    /// errors, FAILED when errors produced nothing.
    pub fn from_counts(created: usize, errors: usize) -> Self {
        if errors == 0 {
            GenerationStatus::Success
        } else if created > 0 {
            GenerationStatus::Partial
        } else {
            GenerationStatus::Failed
        }
    }

    /// Whether an entry with this outcome marks its day as already generated
    pub fn blocks_rerun(&self) -> bool {
        matches!(self, GenerationStatus::Success | GenerationStatus::Partial)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Success => "SUCCESS",
            GenerationStatus::Partial => "PARTIAL",
            GenerationStatus::Failed => "FAILED",
        }
    }
}

/// A failure recorded by a generation run
///
/// Per-order failures carry the order; a run-level failure (the order fetch
/// itself failed) has neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationError {
    pub order_id: Option<i64>,
    pub order_code: Option<String>,
    pub message: String,
}

impl GenerationError {
    pub fn for_order(order_id: i64, order_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            order_id: Some(order_id),
            order_code: Some(order_code.into()),
            message: message.into(),
        }
    }

    pub fn run_level(message: impl Into<String>) -> Self {
        Self {
            order_id: None,
            order_code: None,
            message: message.into(),
        }
    }
}

/// Generation Ledger entry (append-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRun {
    pub id: i64,
    /// Business calendar day the run generated for
    pub execution_date: NaiveDate,
    /// Eligible orders considered
    pub total_orders: i64,
    pub shipments_created: i64,
    /// Orders that already had a shipment for the day
    pub shipments_skipped: i64,
    pub error_count: i64,
    /// Executor identity (user name or `system`)
    pub executed_by: String,
    pub status: GenerationStatus,
    pub error_details: Vec<GenerationError>,
    /// When the entry was written (Unix millis)
    pub created_at: i64,
}

/// Ledger entry to append
#[derive(Debug, Clone)]
pub struct GenerationRunCreate {
    pub execution_date: NaiveDate,
    pub total_orders: i64,
    pub shipments_created: i64,
    pub shipments_skipped: i64,
    pub executed_by: String,
    pub status: GenerationStatus,
    pub error_details: Vec<GenerationError>,
}

/// Generation history filter
///
/// Date bounds are inclusive calendar days. `page` is 1-based.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<GenerationStatus>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

impl Default for GenerationQuery {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            status: None,
            page: default_page(),
            limit: default_limit(),
        }
    }
}

/// One page of generation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationPage {
    pub generations: Vec<GenerationRun>,
    /// Total entries matching the filter (across all pages)
    pub total: i64,
}
