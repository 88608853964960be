//! # Stock Views
//!
//! Read-only views over the batch ledger: the per-medicine snapshot
//! (all lots, cached total, substitutes) and the per-store overview
//! with resolved names and effective prices.
//!
//! These never mutate anything; a snapshot may legitimately show
//! expired-but-still-active lots that no sale has scanned yet.

use serde::Serialize;

use crate::error::{LedgerError, LedgerResult};
use crate::reference::ReferenceData;
use pharma_core::{EntityKind, MedicineId, Money, StockSnapshot, StoreId};
use pharma_db::Database;
use std::sync::Arc;

// =============================================================================
// Overview Row
// =============================================================================

/// One medicine's stock position in the store overview.
#[derive(Debug, Clone, Serialize)]
pub struct StockOverviewRow {
    pub medicine_id: MedicineId,
    pub medicine_name: String,
    pub medicine_form: String,

    /// Cached sellable total from the ledger.
    pub available_stock: i64,

    /// Effective sale price, absent when no pricing row exists.
    pub sale_price: Option<Money>,
}

// =============================================================================
// Stock Views
// =============================================================================

/// Read-only stock queries.
pub struct StockViews {
    db: Database,
    reference: Arc<dyn ReferenceData>,
}

impl StockViews {
    pub fn new(db: Database, reference: Arc<dyn ReferenceData>) -> Self {
        StockViews { db, reference }
    }

    /// Full snapshot of one ledger: cached total, every lot (active and
    /// retired), and substitute medicines by shared composition.
    pub async fn snapshot(
        &self,
        store_id: StoreId,
        medicine_id: MedicineId,
    ) -> LedgerResult<StockSnapshot> {
        let ledger = self
            .db
            .stock()
            .snapshot(store_id, medicine_id)
            .await?
            .ok_or_else(|| {
                LedgerError::NotFound(format!(
                    "stock not found for medicine {medicine_id} at store {store_id}"
                ))
            })?;

        let substitutes = self.reference.substitutes(medicine_id).await?;

        Ok(StockSnapshot {
            store_id: ledger.store_id,
            medicine_id: ledger.medicine_id,
            medicine_form: ledger.medicine_form,
            available_stock: ledger.available_stock,
            lots: ledger.lots,
            substitutes,
        })
    }

    /// Per-store stock listing with resolved medicine names and the
    /// current effective sale price.
    pub async fn store_overview(&self, store_id: StoreId) -> LedgerResult<Vec<StockOverviewRow>> {
        let ledgers = self.db.stock().ledgers_by_store(store_id).await?;
        let pricing = self.db.pricing();

        let mut rows = Vec::with_capacity(ledgers.len());
        for ledger in ledgers {
            let medicine_name = self
                .reference
                .name_of(EntityKind::Medicine, ledger.medicine_id)
                .await?
                .unwrap_or_else(|| format!("medicine {}", ledger.medicine_id));

            let sale_price = pricing
                .get(store_id, ledger.medicine_id)
                .await?
                .map(|record| record.sale_price());

            rows.push(StockOverviewRow {
                medicine_id: ledger.medicine_id,
                medicine_name,
                medicine_form: ledger.medicine_form,
                available_stock: ledger.available_stock,
                sale_price,
            });
        }

        Ok(rows)
    }
}
