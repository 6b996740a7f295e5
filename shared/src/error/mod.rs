//! Error codes and the boundary error of the delivery core
//!
//! Codes are grouped by the thousands digit, which also gives the
//! [`ErrorCategory`]:
//!
//! | Range | Category |
//! |-------|----------|
//! | 0xxx | general |
//! | 1xxx | client |
//! | 4xxx | order |
//! | 5xxx | payment |
//! | 6xxx | shipment |
//! | 9xxx | system |
//!
//! ```
//! use shared::error::{AppError, ErrorCategory, ErrorCode};
//!
//! let err = AppError::new(ErrorCode::PaymentAllocationConflict)
//!     .with_detail("client_id", 42);
//! assert_eq!(err.category(), ErrorCategory::Payment);
//! assert!(err.is_retryable());
//! assert_eq!(err.http_status().as_u16(), 409);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult};
