//! # pharma-core: Pure Business Logic for the Pharmacy Batch Ledger
//!
//! This crate is the **heart** of the inventory engine. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Pharma Ledger Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Use-Case Callers (excluded HTTP layer)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  pharma-ledger (use cases)                      │   │
//! │  │    PurchaseReceiver, SaleAllocator, InvoiceSequencer            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ pharma-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   fefo    │  │  invoice  │  │   money   │  │   │
//! │  │   │    Lot    │  │  planner  │  │  suffix   │  │   Money   │  │   │
//! │  │   │  Ledger   │  │  window   │  │ arithmetic│  │ Discount  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  pharma-db (Database Layer)                     │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Lot, StockLedger, SaleRecord, etc.)
//! - [`money`] - Integer money and basis-point discount rates
//! - [`fefo`] - The First-Expire-First-Out allocation planner
//! - [`invoice`] - Invoice number suffix arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Request validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: allocation is planned here, applied elsewhere
//! 2. **No I/O**: database, network, and clock access are FORBIDDEN here;
//!    callers pass `today` in explicitly
//! 3. **Integer Money**: all monetary values are paise (i64), never floats
//! 4. **Explicit Errors**: typed errors, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod fefo;
pub mod invoice;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use fefo::{plan_allocation, AllocationPlan, EXPIRY_WINDOW_DAYS};
pub use invoice::next_invoice_number;
pub use money::{DiscountRate, Money};
pub use types::*;
pub use validation::{validate_new_purchase, validate_new_sale};
