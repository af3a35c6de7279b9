use rust_decimal::Decimal;
use thiserror::Error;

use crate::catalog::ProductError;
use crate::domain::OrderStatus;
use crate::store::StoreError;

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Errors returned by the ledger.
///
/// Everything except `InvariantViolation`, `Store` and `ActorCommunicationError`
/// is a user-facing rejection that left no trace in the store.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    #[error("Insufficient funds for {user_id}: requested {requested}, available {available}")]
    InsufficientFunds {
        user_id: String,
        requested: Decimal,
        available: Decimal,
    },
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("E-Pin already used: {0}")]
    AlreadyUsed(String),
    #[error("Top-up request already decided: {0}")]
    AlreadyDecided(String),
    #[error("E-Pin expired: {0}")]
    Expired(String),
    #[error("Ledger invariant violated: {0}")]
    InvariantViolation(String),
    #[error("Not permitted for {0}")]
    Forbidden(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Registration is closed")]
    RegistrationClosed,
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),
    #[error("Invalid order status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Catalog(#[from] ProductError),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        LedgerError::NotFound { entity, id: id.into() }
    }

    /// Internal failures that point at a bug or a broken store.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            LedgerError::InvariantViolation(_) | LedgerError::Store(_) | LedgerError::ActorCommunicationError(_)
        )
    }
}
