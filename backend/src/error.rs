//! Error handling for the Inventory Management System engine
//!
//! Every engine call either completes or is rolled back whole; these are
//! the structured errors handed to the caller at that boundary. The engine
//! never retries on its own — retrying is a client decision, made safe by
//! the idempotency guard.

use shared::models::{ReceiptPlanError, StockError};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Referenced product/order/supplier does not exist
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Reservation would drive available stock below zero
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    /// Transition attempted from a terminal or wrong state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Malformed receive request, duplicate lines, inactive supplier,
    /// oversized idempotency key and similar rule breaches
    #[error("Business rule violation: {0}")]
    BusinessRuleViolation(String),

    /// An internal invariant failed. Indicates a bug in the engine, not a
    /// caller mistake.
    #[error("Inconsistent state: {0}")]
    InconsistentState(String),

    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code for boundary translation.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::BusinessRuleViolation(_) => "BUSINESS_RULE_VIOLATION",
            AppError::InconsistentState(_) => "INCONSISTENT_STATE",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller, rather than the engine, is at fault.
    /// InconsistentState is deliberately a server fault: it means an
    /// invariant the engine owns did not hold.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::NotFound(_)
                | AppError::InsufficientStock(_)
                | AppError::InvalidState(_)
                | AppError::BusinessRuleViolation(_)
                | AppError::Validation { .. }
        )
    }

    pub(crate) fn validation(field: &str, message: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::Insufficient { .. } => AppError::InsufficientStock(err.to_string()),
            StockError::ReservedInconsistent { .. } => AppError::InconsistentState(err.to_string()),
            StockError::AdjustBelowZero { .. } => AppError::BusinessRuleViolation(err.to_string()),
            StockError::NonPositiveQuantity(_) => AppError::validation("quantity", &err.to_string()),
        }
    }
}

impl From<ReceiptPlanError> for AppError {
    fn from(err: ReceiptPlanError) -> Self {
        AppError::BusinessRuleViolation(err.to_string())
    }
}

/// Result type alias for engine operations
pub type AppResult<T> = Result<T, AppError>;

/// PostgreSQL unique-constraint violation, used to resolve insert races.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}
