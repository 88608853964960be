//! # Pricing Resolver
//!
//! Read-side pricing: resolves the current price and discount for a
//! (store, medicine) pair and the effective sale price derived from
//! them. Writes go through the pricing repository at store setup and
//! via the seed binary.

use tracing::debug;

use crate::error::{LedgerError, LedgerResult};
use pharma_core::{MedicineId, Money, PricingRecord, StoreId};
use pharma_db::Database;

// =============================================================================
// Pricing Resolver
// =============================================================================

/// Resolves effective prices from the pricing table.
pub struct PricingResolver {
    db: Database,
}

impl PricingResolver {
    pub fn new(db: Database) -> Self {
        PricingResolver { db }
    }

    /// Returns the pricing record for a (store, medicine) pair.
    pub async fn resolve(
        &self,
        store_id: StoreId,
        medicine_id: MedicineId,
    ) -> LedgerResult<PricingRecord> {
        self.db
            .pricing()
            .get(store_id, medicine_id)
            .await?
            .ok_or_else(|| {
                LedgerError::NotFound(format!(
                    "pricing not found for medicine {medicine_id} at store {store_id}"
                ))
            })
    }

    /// Returns the effective sale price: MRP with the discount applied,
    /// or the plain MRP when the discount is non-positive.
    pub async fn sale_price(
        &self,
        store_id: StoreId,
        medicine_id: MedicineId,
    ) -> LedgerResult<Money> {
        let record = self.resolve(store_id, medicine_id).await?;
        let price = record.sale_price();
        debug!(
            store_id,
            medicine_id,
            mrp_paise = record.mrp.paise(),
            discount_bps = record.discount.bps(),
            price_paise = price.paise(),
            "Resolved sale price"
        );
        Ok(price)
    }
}
