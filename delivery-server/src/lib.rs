//! Delivery Server - order-to-cash core of a delivery business
//!
//! - **Daily generation** (`shipments`): turns recurring orders into the
//!   day's shipments, once per calendar day, with an append-only ledger
//! - **On-demand generation** (`shipments::on_demand`): one order, out of band
//! - **Payment allocation** (`payments`): oldest-first waterfall over a
//!   client's unpaid shipments, atomic per payment
//!
//! ```text
//! delivery-server/src/
//! ├── core/       # config, state, background tasks
//! ├── db/         # SQLite pool + repositories
//! ├── shipments/  # generators, ledger, scheduler
//! ├── payments/   # allocation engine
//! ├── notify/     # typed notification queue + worker
//! └── utils/      # time, logging
//! ```

pub mod core;
pub mod db;
pub mod error;
pub mod money;
pub mod notify;
pub mod payments;
pub mod shipments;
pub mod utils;

pub use core::{BackgroundTasks, Config, LogConfig, ServerState, TaskKind};
pub use db::DbService;
pub use error::{ConflictKind, DeliveryError, DeliveryResult};
pub use payments::PaymentAllocator;
pub use shipments::{
    DailyShipmentGenerator, GenerationLedger, GenerationResult, GenerationScheduler,
    OnDemandGenerator, SingleGenerationResult,
};

pub use utils::logger::init_logger_with_file;
