//! Error taxonomy for swap, reputation and review operations
//!
//! Every failure is a local, synchronous outcome of a single operation. A
//! failed operation leaves all records unchanged.

use thiserror::Error;

use crate::models::SwapStatus;

/// Domain result type
pub type SwapResult<T> = Result<T, SwapError>;

/// Store result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a domain operation that did not succeed
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SwapError {
    /// Referenced swap, user or review is absent
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Actor lacks the role the operation requires
    #[error("Not authorized: {0}")]
    Forbidden(String),

    /// State machine precondition unmet
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Duplicate pending swap, duplicate review or taken username
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Malformed rating or missing required field
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Opaque storage failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SwapError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

/// Errors raised by a [`crate::database::SwapStore`] implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Uniqueness constraint rejected the write
    #[error("Duplicate {entity}: {detail}")]
    Duplicate { entity: &'static str, detail: String },

    /// Conditional transition found a different status than required
    #[error("Swap status is {actual}, expected {expected}")]
    StatusMismatch {
        expected: SwapStatus,
        actual: SwapStatus,
    },

    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn duplicate(entity: &'static str, detail: impl Into<String>) -> Self {
        Self::Duplicate {
            entity,
            detail: detail.into(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            // unique_violation
            if db_err.code().as_deref() == Some("23505") {
                let detail = db_err.constraint().unwrap_or("unique constraint").to_string();
                return StoreError::Duplicate {
                    entity: "record",
                    detail,
                };
            }
        }
        StoreError::Database(e.to_string())
    }
}

impl From<StoreError> for SwapError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => SwapError::NotFound { entity, id },
            StoreError::Duplicate { entity, detail } => {
                SwapError::Conflict(format!("{} already exists ({})", entity, detail))
            }
            StoreError::StatusMismatch { expected, actual } => SwapError::InvalidState(format!(
                "swap is {}, operation requires {}",
                actual, expected
            )),
            StoreError::Database(msg) => SwapError::Internal(msg),
        }
    }
}
