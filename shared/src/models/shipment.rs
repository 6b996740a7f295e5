//! Shipment Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Settlement state of a shipment, derived from billed vs. paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PaymentStatus {
    Unpaid,
    Incomplete,
    Completed,
}

impl PaymentStatus {
    /// The only place payment status is computed.
    ///
    /// `COMPLETED` once nothing is owed, `UNPAID` while nothing was paid,
    /// `INCOMPLETE` otherwise. A zero-billed shipment is `COMPLETED`.
    pub fn from_amounts(billed: Decimal, paid: Decimal) -> Self {
        if paid >= billed {
            PaymentStatus::Completed
        } else if paid.is_zero() {
            PaymentStatus::Unpaid
        } else {
            PaymentStatus::Incomplete
        }
    }

    /// Whether the shipment still carries debt
    pub fn is_outstanding(&self) -> bool {
        matches!(self, PaymentStatus::Unpaid | PaymentStatus::Incomplete)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "UNPAID",
            PaymentStatus::Incomplete => "INCOMPLETE",
            PaymentStatus::Completed => "COMPLETED",
        }
    }
}

/// Delivery lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ShipmentStatus {
    #[default]
    Delivered,
    Cancelled,
}

impl ShipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Delivered => "DELIVERED",
            ShipmentStatus::Cancelled => "CANCELLED",
        }
    }
}

/// One dated delivery occurrence billed to a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub id: i64,
    pub order_id: i64,
    pub client_id: i64,
    /// Delivery instant (Unix millis); only the calendar day is significant
    pub delivery_date: i64,
    /// Business calendar day (YYYY-MM-DD) the shipment belongs to
    pub delivery_day: String,
    pub billed_amount: Decimal,
    /// Never decreases, never exceeds `billed_amount`
    pub amount_paid: Decimal,
    pub payment_status: PaymentStatus,
    pub status: ShipmentStatus,
    pub note: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Shipment {
    /// Amount still owed (never negative)
    pub fn outstanding(&self) -> Decimal {
        (self.billed_amount - self.amount_paid).max(Decimal::ZERO)
    }
}

/// Outstanding debt of one client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtSummary {
    pub client_id: i64,
    /// Sum of `billed - paid` over UNPAID/INCOMPLETE shipments
    pub total_debt: Decimal,
    /// Number of UNPAID/INCOMPLETE shipments
    pub pending_count: i64,
}
