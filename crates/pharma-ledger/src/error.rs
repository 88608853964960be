//! # Use-Case Error Types
//!
//! Errors surfaced by the use-case layer to its callers.
//!
//! ## Error Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  CoreError (pharma-core)            LedgerError                         │
//! │    NoStock              ──────────→   NotFound                          │
//! │    InsufficientStock    ──────────→   InsufficientStock                 │
//! │    BadInvoiceFormat     ──────────→   Invoice                           │
//! │    Validation           ──────────→   Validation                        │
//! │                                                                         │
//! │  DbError (pharma-db)                                                    │
//! │    Busy                 ──────────→   Concurrency (retried first)       │
//! │    UniqueViolation      ──────────→   Validation                        │
//! │    NotFound             ──────────→   NotFound                          │
//! │    everything else      ──────────→   Persistence                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use pharma_core::{CoreError, ValidationError};
use pharma_db::DbError;

// =============================================================================
// Ledger Error
// =============================================================================

/// Errors returned by the use-case layer.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Caller input failed validation; nothing was written.
    #[error("validation error: {0}")]
    Validation(String),

    /// A requested entity or ledger does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Sellable quantity falls short of the requested quantity.
    #[error("insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i64, requested: i64 },

    /// The stored invoice sequence holds a malformed value.
    #[error("invoice sequence error: {0}")]
    Invoice(String),

    /// Concurrent writers kept colliding past the retry budget.
    #[error("operation contended, retry later: {0}")]
    Concurrency(String),

    /// An unexpected persistence failure.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Busy(msg) => LedgerError::Concurrency(msg),
            DbError::UniqueViolation { .. } => LedgerError::Validation(err.to_string()),
            DbError::NotFound { .. } => LedgerError::NotFound(err.to_string()),
            other => LedgerError::Persistence(other.to_string()),
        }
    }
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NoStock => LedgerError::NotFound(err.to_string()),
            CoreError::InsufficientStock {
                available,
                requested,
            } => LedgerError::InsufficientStock {
                available,
                requested,
            },
            CoreError::BadInvoiceFormat(_) => LedgerError::Invoice(err.to_string()),
            CoreError::Validation(v) => LedgerError::Validation(v.to_string()),
        }
    }
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Validation(err.to_string())
    }
}

impl LedgerError {
    /// Whether the caller may retry the operation as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Concurrency(_))
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with LedgerError.
pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Unit Tests
// =============================================================================
