//! # pharma-ledger: Use-Case Layer for the Pharmacy Batch Ledger
//!
//! Composes pharma-core (pure policy) with pharma-db (persistence)
//! into the operations a caller-facing surface would expose.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Pharma Ledger Use Cases                             │
//! │                                                                         │
//! │   Caller (HTTP layer, CLI, tests)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  pharma-ledger (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐  ┌──────────────┐  ┌───────────────────┐   │   │
//! │  │   │ SaleAllocator│  │  Purchase    │  │ InvoiceSequencer  │   │   │
//! │  │   │ (FEFO, tx)   │  │  Receiver    │  │ (per-store lock)  │   │   │
//! │  │   └──────┬───────┘  └──────┬───────┘  └─────────┬─────────┘   │   │
//! │  │          │                 │                    │             │   │
//! │  │          └────────┬────────┴────────────────────┘             │   │
//! │  │                   ▼                                           │   │
//! │  │        KeyLocks<(store, medicine)>   shared writer locks      │   │
//! │  │                                                               │   │
//! │  │   ┌──────────────┐  ┌──────────────┐  ┌───────────────────┐  │   │
//! │  │   │PricingResolver│ │  StockViews  │  │     Reports       │  │   │
//! │  │   │ (read-only)  │  │ (snapshots)  │  │ (listings)        │  │   │
//! │  │   └──────────────┘  └──────────────┘  └───────────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                           │                                     │
//! │       ▼                           ▼                                     │
//! │   pharma-core (plan_allocation)   pharma-db (repositories, tx)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency Model
//! Writers take per-(store, medicine) async locks before opening their
//! transaction, in canonical key order, so in-process writers never
//! deadlock and rarely hit SQLite's `Busy`. Cross-process collisions
//! still surface as `Busy` and are retried a bounded number of times.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocator;
pub mod error;
pub mod locks;
pub mod pricing;
pub mod receiver;
pub mod reference;
pub mod reports;
pub mod sequencer;
pub mod snapshot;

// =============================================================================
// Re-exports
// =============================================================================

pub use allocator::{SaleAllocator, SaleReceipt, SaleReceiptLine};
pub use error::{LedgerError, LedgerResult};
pub use locks::KeyLocks;
pub use pricing::PricingResolver;
pub use receiver::{PurchaseReceipt, PurchaseReceiver};
pub use reference::ReferenceData;
pub use reports::{PurchaseView, Reports};
pub use sequencer::InvoiceSequencer;
pub use snapshot::{StockOverviewRow, StockViews};

use std::sync::Arc;

use pharma_core::{MedicineId, StoreId};
use pharma_db::Database;

// =============================================================================
// Ledger Facade
// =============================================================================

/// Bundles every use-case service over one database handle.
///
/// The write services share a single lock registry; constructing them
/// separately would silently lose the per-ledger serialization.
pub struct Ledger {
    pub receiver: PurchaseReceiver,
    pub allocator: SaleAllocator,
    pub sequencer: Arc<InvoiceSequencer>,
    pub pricing: PricingResolver,
    pub views: StockViews,
    pub reports: Reports,
}

impl Ledger {
    /// Wires the use-case services over `db`, using the database's own
    /// reference tables as the reference data store.
    pub fn new(db: Database) -> Self {
        Self::with_reference(db.clone(), Arc::new(db.reference()))
    }

    /// Wires the use-case services with an external reference store.
    pub fn with_reference(db: Database, reference: Arc<dyn ReferenceData>) -> Self {
        let ledger_locks: Arc<KeyLocks<(StoreId, MedicineId)>> = Arc::new(KeyLocks::new());
        let sequencer = Arc::new(InvoiceSequencer::new(db.invoices()));

        Ledger {
            receiver: PurchaseReceiver::new(db.clone(), reference.clone(), ledger_locks.clone()),
            allocator: SaleAllocator::new(
                db.clone(),
                reference.clone(),
                sequencer.clone(),
                ledger_locks,
            ),
            sequencer,
            pricing: PricingResolver::new(db.clone()),
            views: StockViews::new(db.clone(), reference.clone()),
            reports: Reports::new(db, reference),
        }
    }
}
