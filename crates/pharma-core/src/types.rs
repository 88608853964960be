//! # Domain Types
//!
//! Core domain types for the pharmacy batch ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   StockLedger   │   │ PurchaseRecord  │   │   SaleRecord    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  (store, med)   │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  lots: Vec<Lot> │   │  invoice (bill) │   │  invoice (ours) │       │
//! │  │  available      │   │  items          │   │  items+batches  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Lot        │   │  PricingRecord  │   │   EntityKind    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  batch_number   │   │  mrp, discount  │   │  Store          │       │
//! │  │  expiry_date    │   │  net_rate       │   │  Medicine       │       │
//! │  │  remaining_qty  │   │  sale_price()   │   │  Manufacturer   │       │
//! │  │  is_active      │   └─────────────────┘   │  Distributor    │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Append-only records (purchases, sales) carry a UUID v4 `id` for
//! relations plus a human-facing business number (invoice number).
//! Reference entities keep the numeric ids of the master tables.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::{DiscountRate, Money};

// =============================================================================
// Identifiers
// =============================================================================

/// Numeric id of a store in the reference data store.
pub type StoreId = i64;

/// Numeric id of a medicine catalog entry.
pub type MedicineId = i64;

/// Numeric id of a manufacturer.
pub type ManufacturerId = i64;

/// Numeric id of a distributor.
pub type DistributorId = i64;

/// The kinds of reference entities resolvable at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Store,
    Medicine,
    Manufacturer,
    Distributor,
}

impl EntityKind {
    /// Display name used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Store => "Store",
            EntityKind::Medicine => "Medicine",
            EntityKind::Manufacturer => "Manufacturer",
            EntityKind::Distributor => "Distributor",
        }
    }
}

// =============================================================================
// Lot
// =============================================================================

/// A batch of one medicine received in a single purchase event.
///
/// Created with its full quantity by the purchase receiver; only the
/// sale allocator decrements it, and only the expiry check deactivates
/// it. Once `is_active` is false the lot is permanently inert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    /// Batch number - unique within its (store, medicine) ledger.
    pub batch_number: String,

    /// Calendar expiry date printed on the pack.
    pub expiry_date: NaiveDate,

    /// Quantity received at purchase time (immutable).
    pub quantity_received: i64,

    /// Quantity still on the shelf.
    pub remaining_quantity: i64,

    /// False once expired-out or otherwise retired.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Stock Ledger
// =============================================================================

/// The stock aggregate for one (store, medicine) pair.
///
/// `available_stock` is a cached value: it always equals the
/// recomputation over the current sellable lots and is rebuilt in the
/// same transaction as any lot mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLedger {
    pub store_id: StoreId,
    pub medicine_id: MedicineId,

    /// Dosage form (tablet, syrup, ...), denormalized for listings.
    pub medicine_form: String,

    /// Cached sellable total (active lots beyond the expiry window).
    pub available_stock: i64,

    pub is_active: bool,
    pub lots: Vec<Lot>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Purchase
// =============================================================================

/// One line of a purchase bill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseItem {
    pub id: String,
    pub medicine_id: MedicineId,
    pub manufacturer_id: ManufacturerId,
    pub batch_number: String,
    pub expiry_date: NaiveDate,
    pub quantity: i64,
    pub mrp: Money,
    pub discount: DiscountRate,
    pub purchase_amount: Money,
}

/// An immutable purchase record, written once by the purchase receiver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// Unique identifier (UUID v4).
    pub id: String,
    pub store_id: StoreId,
    pub distributor_id: DistributorId,
    pub purchase_date: NaiveDate,

    /// The distributor's bill number, taken as-is.
    pub invoice_number: String,

    pub total_amount: Money,
    pub items: Vec<PurchaseItem>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

/// Quantity consumed from one batch during allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConsumption {
    pub batch_number: String,
    pub quantity: i64,
}

/// One line of a sale, with its per-batch consumption breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItem {
    pub id: String,
    pub medicine_id: MedicineId,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
    pub consumptions: Vec<BatchConsumption>,
}

/// An immutable sale record, written once by the sale allocator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRecord {
    /// Unique identifier (UUID v4).
    pub id: String,
    pub store_id: StoreId,
    pub customer_id: String,
    pub sale_date: NaiveDate,

    /// Issued by the invoice sequencer; unique and increasing per store.
    pub invoice_number: String,

    pub total_amount: Money,
    pub items: Vec<SaleItem>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Pricing
// =============================================================================

/// Current price and discount for one (store, medicine) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingRecord {
    pub store_id: StoreId,
    pub medicine_id: MedicineId,
    pub mrp: Money,
    pub discount: DiscountRate,
    pub net_rate: Money,
    pub last_updated_by: String,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl PricingRecord {
    /// Computed sale price: the MRP when the discount is non-positive,
    /// otherwise the discounted MRP.
    pub fn sale_price(&self) -> Money {
        self.discount.apply(self.mrp)
    }
}

// =============================================================================
// Snapshot Views
// =============================================================================

/// A substitute medicine sharing the same composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitute {
    pub medicine_id: MedicineId,
    pub medicine_name: String,
}

/// Reporting view over one ledger: every lot (active and inactive)
/// plus the cached total and substitute medicines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub store_id: StoreId,
    pub medicine_id: MedicineId,
    pub medicine_form: String,
    pub available_stock: i64,
    pub lots: Vec<Lot>,
    pub substitutes: Vec<Substitute>,
}

// =============================================================================
// Use-Case Requests
// =============================================================================

/// One line of an incoming purchase bill, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPurchaseItem {
    pub medicine_id: MedicineId,
    pub manufacturer_id: ManufacturerId,
    pub batch_number: String,
    pub expiry_date: NaiveDate,
    pub quantity: i64,
    pub mrp: Money,
    pub discount: DiscountRate,
    pub purchase_amount: Money,
}

/// An incoming purchase bill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPurchase {
    pub store_id: StoreId,
    pub distributor_id: DistributorId,
    pub purchase_date: NaiveDate,
    pub invoice_number: String,
    pub items: Vec<NewPurchaseItem>,
}

/// One requested sale line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSaleItem {
    pub medicine_id: MedicineId,
    pub quantity: i64,
}

/// An incoming sale request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSale {
    pub store_id: StoreId,
    pub customer_id: String,
    pub sale_date: NaiveDate,
    pub items: Vec<NewSaleItem>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_names() {
        assert_eq!(EntityKind::Store.as_str(), "Store");
        assert_eq!(EntityKind::Distributor.as_str(), "Distributor");
    }

    #[test]
    fn test_sale_price_with_discount() {
        let pricing = PricingRecord {
            store_id: 1,
            medicine_id: 7,
            mrp: Money::from_paise(10_000),
            discount: DiscountRate::from_bps(500), // 5%
            net_rate: Money::from_paise(9_000),
            last_updated_by: "seed".to_string(),
            is_active: true,
            updated_at: Utc::now(),
        };
        assert_eq!(pricing.sale_price(), Money::from_paise(9_500));
    }

    #[test]
    fn test_sale_price_without_discount() {
        let pricing = PricingRecord {
            store_id: 1,
            medicine_id: 7,
            mrp: Money::from_paise(10_000),
            discount: DiscountRate::zero(),
            net_rate: Money::from_paise(9_000),
            last_updated_by: "seed".to_string(),
            is_active: true,
            updated_at: Utc::now(),
        };
        assert_eq!(pricing.sale_price(), Money::from_paise(10_000));
    }
}
