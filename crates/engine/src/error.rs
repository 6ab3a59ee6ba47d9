//! The errors the engine can return.
//!
//! Every variant is a recoverable, caller-visible failure; the engine never
//! aborts the process. [`ConcurrencyConflict`] is retryable by the caller —
//! the engine itself performs no automatic retry.
//!
//! [`ConcurrencyConflict`]: EngineError::ConcurrencyConflict
use sea_orm::DbErr;
use thiserror::Error;

use crate::Quantity;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Insufficient stock: {available} available")]
    InsufficientStock { available: Quantity },
    #[error("Insufficient credit: {0}")]
    InsufficientCredit(String),
    #[error("Sale not owned by client: {0}")]
    SaleNotOwnedByClient(String),
    #[error("Sale fully paid: {0}")]
    SaleFullyPaid(String),
    #[error("Duplicate check number: {0}")]
    DuplicateCheckNumber(String),
    #[error("Invalid status: {0}")]
    InvalidStatus(String),
    #[error("Invalid kind: {0}")]
    InvalidKind(String),
    #[error("Cannot delete a collected check: {0}")]
    CannotDeleteCollected(String),
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("\"{0}\" already present!")]
    AlreadyExists(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidQuantity(a), Self::InvalidQuantity(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InsufficientStock { available: a }, Self::InsufficientStock { available: b }) => {
                a == b
            }
            (Self::InsufficientCredit(a), Self::InsufficientCredit(b)) => a == b,
            (Self::SaleNotOwnedByClient(a), Self::SaleNotOwnedByClient(b)) => a == b,
            (Self::SaleFullyPaid(a), Self::SaleFullyPaid(b)) => a == b,
            (Self::DuplicateCheckNumber(a), Self::DuplicateCheckNumber(b)) => a == b,
            (Self::InvalidStatus(a), Self::InvalidStatus(b)) => a == b,
            (Self::InvalidKind(a), Self::InvalidKind(b)) => a == b,
            (Self::CannotDeleteCollected(a), Self::CannotDeleteCollected(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::AlreadyExists(a), Self::AlreadyExists(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::ConcurrencyConflict(a), Self::ConcurrencyConflict(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
