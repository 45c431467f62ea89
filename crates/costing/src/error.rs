//! Unified error handling for costing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use concreto_core::{AllocationError, RemisionId};

use crate::db::RepositoryError;

/// Costing-level error type.
#[derive(Debug, Error)]
pub enum CostingError {
    /// Requested quantity exceeds what the eligible lots hold.
    #[error("Insufficient inventory: requested {requested} kg, available {available} kg")]
    InsufficientInventory {
        requested: Decimal,
        available: Decimal,
    },

    /// Lock or compare-and-decrement conflict; retry from a fresh snapshot.
    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    /// The remision already has committed allocations.
    #[error("Remision {0} is already confirmed")]
    AlreadyConfirmed(RemisionId),

    /// Non-positive quantity, unknown material or plant, or similar.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A lot that must be drawn has no price and the price list has none either.
    #[error("Missing unit price: {0}")]
    MissingUnitPrice(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Repository(RepositoryError),
}

/// Stable, serializable classification of a [`CostingError`].
///
/// Used in per-line error reports so callers can branch without parsing
/// messages (e.g. show "insufficient stock" vs. "please retry").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InsufficientInventory,
    ConcurrentModification,
    AlreadyConfirmed,
    InvalidInput,
    MissingUnitPrice,
    NotFound,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            Self::InsufficientInventory => "insufficient_inventory",
            Self::ConcurrentModification => "concurrent_modification",
            Self::AlreadyConfirmed => "already_confirmed",
            Self::InvalidInput => "invalid_input",
            Self::MissingUnitPrice => "missing_unit_price",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        };
        f.write_str(code)
    }
}

impl CostingError {
    /// Classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientInventory { .. } => ErrorKind::InsufficientInventory,
            Self::ConcurrentModification(_) => ErrorKind::ConcurrentModification,
            Self::AlreadyConfirmed(_) => ErrorKind::AlreadyConfirmed,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::MissingUnitPrice(_) => ErrorKind::MissingUnitPrice,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Repository(_) => ErrorKind::Internal,
        }
    }

    /// Whether retrying the whole operation from a fresh read may succeed.
    ///
    /// Only contention is retryable; insufficient stock is a caller decision.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification(_))
    }
}

impl From<RepositoryError> for CostingError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::ConcurrentModification(msg) => Self::ConcurrentModification(msg),
            RepositoryError::NotFound => Self::NotFound("record".to_string()),
            RepositoryError::InvalidInput(msg) => Self::InvalidInput(msg),
            other => Self::Repository(other),
        }
    }
}

impl From<sqlx::Error> for CostingError {
    fn from(err: sqlx::Error) -> Self {
        RepositoryError::from(err).into()
    }
}

impl From<AllocationError> for CostingError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::InsufficientInventory {
                requested,
                available,
            } => Self::InsufficientInventory {
                requested,
                available,
            },
            AllocationError::MissingUnitPrice { .. } => Self::MissingUnitPrice(err.to_string()),
            AllocationError::InvalidQuantity(_) | AllocationError::Overflow { .. } => {
                Self::InvalidInput(err.to_string())
            }
            AllocationError::InvalidLayer { .. } => {
                Self::Repository(RepositoryError::DataCorruption(err.to_string()))
            }
        }
    }
}
