//! # Repository Implementations
//!
//! One repository per aggregate:
//!
//! - [`stock`] - The batch ledger (one aggregate per store/medicine)
//! - [`purchase`] - Append-only purchase records
//! - [`sale`] - Append-only sale records
//! - [`invoice`] - Per-store invoice sequences
//! - [`pricing`] - Current price/discount per store/medicine
//! - [`reference`] - Master-data lookups backing the ReferenceData seam
//!
//! ## Transaction Composition
//! Operations that participate in cross-repository writes exist as
//! `*_tx` associated functions taking `&mut SqliteConnection`; the
//! use-case layer owns the transaction. `&self` methods are
//! single-operation conveniences over the pool.

pub mod invoice;
pub mod pricing;
pub mod purchase;
pub mod reference;
pub mod sale;
pub mod stock;
