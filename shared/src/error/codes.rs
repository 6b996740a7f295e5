//! Unified error codes
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Client errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Shipment errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable numeric error code, serialized as a bare `u16`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    Success = 0,
    /// Bad caller input (amounts, dates, paging)
    ValidationFailed = 2,
    NotFound = 3,
    /// A unique row already exists
    AlreadyExists = 4,

    // ==================== 1xxx: Client ====================
    ClientNotFound = 1001,

    // ==================== 4xxx: Order ====================
    OrderNotFound = 4001,
    /// Order is not active
    OrderInactive = 4002,

    // ==================== 5xxx: Payment ====================
    /// Client has no UNPAID/INCOMPLETE shipments
    PaymentNoOutstandingDebt = 5002,
    /// A shipment changed while the payment was being applied
    PaymentAllocationConflict = 5003,
    /// Payment code already used
    PaymentCodeExists = 5004,
    PaymentNotFound = 5005,

    // ==================== 6xxx: Shipment ====================
    ShipmentNotFound = 6001,

    // ==================== 9xxx: System ====================
    InternalError = 9001,
    DatabaseError = 9002,
    /// Storage timed out or is locked; the caller may retry
    DatabaseUnavailable = 9003,
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Whether a caller should retry the whole operation from a fresh read
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::PaymentAllocationConflict | ErrorCode::DatabaseUnavailable
        )
    }

    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",

            // Client
            ErrorCode::ClientNotFound => "Client not found",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderInactive => "Order is not active",

            // Payment
            ErrorCode::PaymentNoOutstandingDebt => "Client has no outstanding debt",
            ErrorCode::PaymentAllocationConflict => {
                "Shipment balances changed concurrently, retry the payment"
            }
            ErrorCode::PaymentCodeExists => "Payment code already exists",
            ErrorCode::PaymentNotFound => "Payment not found",

            // Shipment
            ErrorCode::ShipmentNotFound => "Shipment not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::DatabaseUnavailable => "Database unavailable, please retry later",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),

            // Client
            1001 => Ok(ErrorCode::ClientNotFound),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderInactive),

            // Payment
            5002 => Ok(ErrorCode::PaymentNoOutstandingDebt),
            5003 => Ok(ErrorCode::PaymentAllocationConflict),
            5004 => Ok(ErrorCode::PaymentCodeExists),
            5005 => Ok(ErrorCode::PaymentNotFound),

            // Shipment
            6001 => Ok(ErrorCode::ShipmentNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::DatabaseUnavailable),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::ClientNotFound.code(), 1001);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::OrderInactive.code(), 4002);
        assert_eq!(ErrorCode::PaymentNoOutstandingDebt.code(), 5002);
        assert_eq!(ErrorCode::ShipmentNotFound.code(), 6001);
        assert_eq!(ErrorCode::DatabaseUnavailable.code(), 9003);
    }

    #[test]
    fn test_try_from_valid() {
        assert_eq!(ErrorCode::try_from(0), Ok(ErrorCode::Success));
        assert_eq!(ErrorCode::try_from(4001), Ok(ErrorCode::OrderNotFound));
        assert_eq!(
            ErrorCode::try_from(5003),
            Ok(ErrorCode::PaymentAllocationConflict)
        );
        assert_eq!(ErrorCode::try_from(9001), Ok(ErrorCode::InternalError));
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(1), Err(InvalidErrorCode(1)));
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(10000), Err(InvalidErrorCode(10000)));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::PaymentNoOutstandingDebt).unwrap();
        assert_eq!(json, "5002");

        let code: ErrorCode = serde_json::from_str("4002").unwrap();
        assert_eq!(code, ErrorCode::OrderInactive);

        let result: Result<ErrorCode, _> = serde_json::from_str("1234");
        assert!(result.is_err());
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCode::PaymentAllocationConflict.is_retryable());
        assert!(ErrorCode::DatabaseUnavailable.is_retryable());
        assert!(!ErrorCode::PaymentNoOutstandingDebt.is_retryable());
        assert!(!ErrorCode::InternalError.is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ErrorCode::Success), "0");
        assert_eq!(format!("{}", ErrorCode::OrderNotFound), "4001");
    }
}
