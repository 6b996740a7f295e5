//! Service-layer error type
//!
//! `DeliveryError` is what the generators and the allocator return. It
//! bridges repository errors (`RepoError`) and the caller-facing
//! `shared::error::AppError`.

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

use crate::db::repository::RepoError;
use crate::money::MoneyError;

/// What a `Conflict` collided with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// A unique row already exists
    Duplicate,
    /// The payment code is already taken
    PaymentCode,
    /// A shipment balance changed between read and write
    ConcurrentUpdate,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: i64 },

    #[error("Order {order_code} is not active")]
    InactiveOrder { order_id: i64, order_code: String },

    #[error("Client {client_id} has no outstanding debt")]
    NoOutstandingDebt { client_id: i64 },

    #[error("Conflict: {message}")]
    Conflict { kind: ConflictKind, message: String },

    #[error("Repository unavailable: {0}")]
    RepositoryUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeliveryError {
    pub fn not_found(resource: &'static str, id: i64) -> Self {
        Self::NotFound { resource, id }
    }

    pub fn concurrent_update(message: impl Into<String>) -> Self {
        Self::Conflict {
            kind: ConflictKind::ConcurrentUpdate,
            message: message.into(),
        }
    }

    /// Whether the caller should retry the whole operation from a fresh read
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DeliveryError::RepositoryUnavailable(_)
                | DeliveryError::Conflict {
                    kind: ConflictKind::ConcurrentUpdate,
                    ..
                }
        )
    }
}

impl From<RepoError> for DeliveryError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => DeliveryError::Internal(format!("Missing row: {msg}")),
            RepoError::Duplicate(msg) => DeliveryError::Conflict {
                kind: ConflictKind::Duplicate,
                message: msg,
            },
            RepoError::Conflict(msg) => DeliveryError::concurrent_update(msg),
            RepoError::Unavailable(msg) => DeliveryError::RepositoryUnavailable(msg),
            RepoError::Database(msg) => DeliveryError::Internal(msg),
            RepoError::Validation(msg) => DeliveryError::InvalidArgument(msg),
        }
    }
}

impl From<sqlx::Error> for DeliveryError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::from(err).into()
    }
}

impl From<MoneyError> for DeliveryError {
    fn from(err: MoneyError) -> Self {
        DeliveryError::InvalidArgument(err.to_string())
    }
}

impl From<DeliveryError> for AppError {
    fn from(err: DeliveryError) -> Self {
        let message = err.to_string();
        match err {
            DeliveryError::InvalidArgument(_) => {
                AppError::with_message(ErrorCode::ValidationFailed, message)
            }
            DeliveryError::NotFound { resource, id } => {
                let code = match resource {
                    "client" => ErrorCode::ClientNotFound,
                    "order" => ErrorCode::OrderNotFound,
                    "shipment" => ErrorCode::ShipmentNotFound,
                    "payment" => ErrorCode::PaymentNotFound,
                    _ => ErrorCode::NotFound,
                };
                AppError::with_message(code, message).with_detail("id", id)
            }
            DeliveryError::InactiveOrder { order_id, .. } => {
                AppError::with_message(ErrorCode::OrderInactive, message)
                    .with_detail("order_id", order_id)
            }
            DeliveryError::NoOutstandingDebt { client_id } => {
                AppError::with_message(ErrorCode::PaymentNoOutstandingDebt, message)
                    .with_detail("client_id", client_id)
            }
            DeliveryError::Conflict { kind, .. } => {
                let code = match kind {
                    ConflictKind::Duplicate => ErrorCode::AlreadyExists,
                    ConflictKind::PaymentCode => ErrorCode::PaymentCodeExists,
                    ConflictKind::ConcurrentUpdate => ErrorCode::PaymentAllocationConflict,
                };
                AppError::with_message(code, message)
            }
            DeliveryError::RepositoryUnavailable(_) => {
                AppError::with_message(ErrorCode::DatabaseUnavailable, message)
            }
            DeliveryError::Internal(msg) => {
                tracing::error!(error = %msg, "Delivery internal error");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

/// Convenience type alias for service-layer results
pub type DeliveryResult<T> = Result<T, DeliveryError>;
