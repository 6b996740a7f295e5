//! Data models
//!
//! Shared between delivery-server and any caller layer wrapping it.
//! Enum types derive `sqlx::Type` behind the `db` feature; structs carrying
//! money are mapped from row types inside the server since amounts are
//! stored as integer cents.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY), timestamps are Unix millis.

pub mod client;
pub mod generation;
pub mod order;
pub mod payment;
pub mod shipment;

// Re-exports
pub use client::*;
pub use generation::*;
pub use order::*;
pub use payment::*;
pub use shipment::*;
