//! Shared types for the delivery order-to-cash core
//!
//! Domain models (orders, shipments, generation runs, payments) and the
//! unified error system used by `delivery-server` and by whatever caller
//! layer wraps it.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
