//! # Purchase and Sale Reporting
//!
//! Read-only listings over the append-only records, with reference ids
//! resolved to display names. Soft-deleted records never appear.

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

use crate::error::{LedgerError, LedgerResult};
use crate::reference::ReferenceData;
use pharma_core::{EntityKind, PurchaseRecord, SaleRecord, StoreId};
use pharma_db::Database;

// =============================================================================
// Views
// =============================================================================

/// A purchase record with its distributor name resolved.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseView {
    pub distributor_name: String,
    #[serde(flatten)]
    pub record: PurchaseRecord,
}

// =============================================================================
// Reports
// =============================================================================

/// Read-only reporting over purchases and sales.
pub struct Reports {
    db: Database,
    reference: Arc<dyn ReferenceData>,
}

impl Reports {
    pub fn new(db: Database, reference: Arc<dyn ReferenceData>) -> Self {
        Reports { db, reference }
    }

    /// All active purchases of a store, newest first.
    pub async fn purchases_by_store(&self, store_id: StoreId) -> LedgerResult<Vec<PurchaseView>> {
        let records = self.db.purchases().list_by_store(store_id).await?;
        self.resolve_purchases(records).await
    }

    /// Active purchases of a store within `[from, to]` inclusive.
    pub async fn purchases_between(
        &self,
        store_id: StoreId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> LedgerResult<Vec<PurchaseView>> {
        let records = self
            .db
            .purchases()
            .list_by_store_between(store_id, from, to)
            .await?;
        self.resolve_purchases(records).await
    }

    /// All active sales of a store, newest first.
    pub async fn sales_by_store(&self, store_id: StoreId) -> LedgerResult<Vec<SaleRecord>> {
        Ok(self.db.sales().list_by_store(store_id).await?)
    }

    /// One sale by record id, consumption breakdown included.
    pub async fn sale_by_id(&self, id: &str) -> LedgerResult<SaleRecord> {
        self.db
            .sales()
            .get(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("Sale not found: {id}")))
    }

    async fn resolve_purchases(
        &self,
        records: Vec<PurchaseRecord>,
    ) -> LedgerResult<Vec<PurchaseView>> {
        let mut views = Vec::with_capacity(records.len());
        for record in records {
            let distributor_name = self
                .reference
                .name_of(EntityKind::Distributor, record.distributor_id)
                .await?
                .unwrap_or_else(|| format!("distributor {}", record.distributor_id));
            views.push(PurchaseView {
                distributor_name,
                record,
            });
        }
        Ok(views)
    }
}
