//! # pharma-db: Database Layer for the Pharma Batch Ledger
//!
//! This crate provides database access for the pharmacy inventory ledger.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Pharma Ledger Data Flow                            │
//! │                                                                         │
//! │  pharma-ledger use case (allocate_sale, receive_purchase)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     pharma-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  (stock.rs)   │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │    │ StockRepo     │    │ 001_init.sql │  │   │
//! │  │   │ Connection    │◄───│ SaleRepo      │    │              │  │   │
//! │  │   │ Management    │    │ InvoiceRepo   │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   <data dir>/pharma-ledger/ledger.db                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (stock, purchase, sale, ...)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pharma_db::{Database, DbConfig};
//!
//! // Create database with default config (runs migrations)
//! let config = DbConfig::new("path/to/ledger.db");
//! let db = Database::new(config).await?;
//!
//! // Use repositories
//! let snapshot = db.stock().snapshot(store_id, medicine_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::invoice::InvoiceRepository;
pub use repository::pricing::PricingRepository;
pub use repository::purchase::PurchaseRepository;
pub use repository::reference::ReferenceRepository;
pub use repository::sale::SaleRepository;
pub use repository::stock::StockRepository;
