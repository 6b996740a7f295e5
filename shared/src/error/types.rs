//! Boundary error type
//!
//! `AppError` is what leaves the delivery core: a stable [`ErrorCode`], a
//! message safe to show an operator, and optional ids the caller layer can
//! use without parsing the message.

use super::category::ErrorCategory;
use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    /// Entity ids and similar context (`order_id`, `client_id`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Error carrying the code's default message
    pub fn new(code: ErrorCode) -> Self {
        Self::with_message(code, code.message())
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.as_ref()?.get(key)
    }

    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// The same call may succeed after a fresh read
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Storage failed in a way retrying will not fix (bad path, migration)
    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, msg)
    }

    /// Storage could not be reached in time; retryable
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseUnavailable, msg)
    }
}

pub type AppResult<T> = Result<T, AppError>;
