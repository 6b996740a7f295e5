//! Core module - configuration, state and background tasks
//!
//! - [`Config`] - server configuration, [`LogConfig`] - logger settings
//! - [`ServerState`] - shared handles (database, notification queue)
//! - [`BackgroundTasks`] - lifecycle of long-running tasks

pub mod config;
pub mod state;
pub mod tasks;

pub use config::{Config, LogConfig};
pub use state::ServerState;
pub use tasks::{BackgroundTasks, TaskKind};
