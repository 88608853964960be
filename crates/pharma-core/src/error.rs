//! # Error Types
//!
//! Domain-specific error types for pharma-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  pharma-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule failures (FEFO, invoices)        │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  pharma-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  pharma-ledger errors (separate crate)                                 │
//! │  └── LedgerError      - What use-case callers see                      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (batch number, quantities, etc.)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No ledger (or no lots at all) exists for the requested medicine.
    ///
    /// ## When This Occurs
    /// - A sale is requested for a (store, medicine) pair that has never
    ///   received a purchase
    /// - The ledger was soft-deactivated
    #[error("stock not found")]
    NoStock,

    /// Sellable quantity falls short of the requested quantity.
    ///
    /// Sellable means: active lots whose expiry date lies beyond the
    /// 30-day expiry window. Lots inside the window do not count even
    /// when they still hold quantity.
    #[error("insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i64, requested: i64 },

    /// A stored invoice number does not end in a decimal suffix.
    ///
    /// ## When This Occurs
    /// - The seed row for a store was written with a malformed value
    #[error("invoice number '{0}' has no numeric suffix")]
    BadInvoiceFormat(String),

    /// Validation error (wraps ValidationError).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements and are
/// detected before any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Monetary value must not be negative.
    #[error("{field} must not be negative")]
    NegativeAmount { field: String },

    /// Expiry date already passed at receipt time.
    #[error("batch {batch_number} expired on {expiry_date}")]
    ExpiredAtReceipt {
        batch_number: String,
        expiry_date: String,
    },

    /// Duplicate value (e.g., duplicate batch number within a ledger).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// A referenced entity does not exist in the reference data store.
    #[error("{entity} not found: {id}")]
    UnknownReference { entity: String, id: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
