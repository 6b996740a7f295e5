//! Payment Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Amount of a payment applied to one shipment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAllocation {
    pub shipment_id: i64,
    pub amount_applied: Decimal,
}

/// Payment entity, created together with its allocation list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub client_id: i64,
    /// Unique human-facing code (`PAY-<id>` unless supplied)
    pub payment_code: String,
    /// Full amount received, as supplied by the caller
    pub amount_paid: Decimal,
    /// Part of `amount_paid` left over after all debt was cleared
    pub unallocated_amount: Decimal,
    /// Payment date (Unix millis)
    pub payment_date: i64,
    /// Payment time of day (HH:MM), as entered
    pub payment_time: Option<String>,
    /// Registering user
    pub registered_by: i64,
    /// Oldest shipment first
    pub allocations: Vec<PaymentAllocation>,
    pub created_at: i64,
}

impl Payment {
    /// Sum of the allocation list
    pub fn allocated_amount(&self) -> Decimal {
        self.allocations.iter().map(|a| a.amount_applied).sum()
    }
}

/// Caller-supplied payment metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentMeta {
    /// Defaults to now
    pub payment_date: Option<i64>,
    pub payment_time: Option<String>,
    /// Generated when absent
    pub payment_code: Option<String>,
    pub registered_by: i64,
}
