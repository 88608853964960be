//! # Sale Allocator
//!
//! Allocates a sale against the batch ledger using FEFO (first-expiry,
//! first-out) and writes the sale record atomically.
//!
//! ## Allocation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sale Allocation                                  │
//! │                                                                         │
//! │   NewSale                                                               │
//! │      │ validate, resolve store + per-line pricing                       │
//! │      ▼                                                                  │
//! │   issue invoice number (sequencer, per-store lock)                      │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │   lock_many (store, medicine) keys in canonical order                   │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │   BEGIN                                                                 │
//! │     per line: read lots ─► plan FEFO ─► apply (decrement, retire)      │
//! │     insert sale + items + per-batch consumptions                        │
//! │   COMMIT                        ── all lines or none                    │
//! │                                                                         │
//! │   On a planning failure the transaction rolls back, then the expired    │
//! │   batches the scan uncovered are retired in their own transaction:      │
//! │   the failed sale must not resurrect stock already seen to be bad.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::locks::KeyLocks;
use crate::reference::{require, ReferenceData};
use crate::sequencer::InvoiceSequencer;
use pharma_core::fefo::is_expiring;
use pharma_core::{
    plan_allocation, validate_new_sale, BatchConsumption, EntityKind, Lot, MedicineId, Money,
    NewSale, PricingRecord, SaleItem, SaleRecord, StoreId,
};
use pharma_db::{Database, DbError, SaleRepository, StockRepository};

// =============================================================================
// Constants
// =============================================================================

/// Attempts before a contended allocation is given up on.
const MAX_ATTEMPTS: u32 = 3;

/// Base backoff between attempts; grows linearly per attempt.
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

// =============================================================================
// Receipt
// =============================================================================

/// One allocated line in the receipt.
#[derive(Debug, Clone, Serialize)]
pub struct SaleReceiptLine {
    pub medicine_id: MedicineId,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,

    /// Batches the quantity was drawn from, in FEFO order.
    pub consumptions: Vec<BatchConsumption>,
}

/// Summary returned to the caller after a successful sale.
#[derive(Debug, Clone, Serialize)]
pub struct SaleReceipt {
    /// Generated sale record id (UUID v4).
    pub sale_id: String,

    /// Invoice number issued for this sale.
    pub invoice_number: String,

    pub total_amount: Money,
    pub lines: Vec<SaleReceiptLine>,
}

// =============================================================================
// Sale Allocator
// =============================================================================

/// Allocates sales against the batch ledger.
pub struct SaleAllocator {
    db: Database,
    reference: Arc<dyn ReferenceData>,
    sequencer: Arc<InvoiceSequencer>,
    ledger_locks: Arc<KeyLocks<(StoreId, MedicineId)>>,
}

impl SaleAllocator {
    /// Creates an allocator sharing `ledger_locks` with the receiver.
    pub fn new(
        db: Database,
        reference: Arc<dyn ReferenceData>,
        sequencer: Arc<InvoiceSequencer>,
        ledger_locks: Arc<KeyLocks<(StoreId, MedicineId)>>,
    ) -> Self {
        SaleAllocator {
            db,
            reference,
            sequencer,
            ledger_locks,
        }
    }

    /// Allocates and records a sale.
    ///
    /// All lines succeed or none do. The issued invoice number is
    /// consumed even when allocation then fails; sequence gaps are
    /// acceptable, reused numbers are not.
    pub async fn allocate(&self, sale: NewSale, today: NaiveDate) -> LedgerResult<SaleReceipt> {
        validate_new_sale(&sale)?;
        require(&*self.reference, EntityKind::Store, sale.store_id).await?;
        let pricing = self.resolve_pricing(&sale).await?;

        let invoice_number = self.sequencer.next_invoice(sale.store_id).await?;

        // One guard per distinct ledger touched by this sale
        let keys: Vec<(StoreId, MedicineId)> = sale
            .items
            .iter()
            .map(|item| (sale.store_id, item.medicine_id))
            .collect();
        let _guards = self.ledger_locks.lock_many(&keys).await;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .write_sale(&sale, &pricing, &invoice_number, today)
                .await
            {
                Ok(receipt) => {
                    info!(
                        sale_id = %receipt.sale_id,
                        store_id = sale.store_id,
                        invoice_number = %receipt.invoice_number,
                        lines = receipt.lines.len(),
                        total_paise = receipt.total_amount.paise(),
                        "Sale allocated"
                    );
                    return Ok(receipt);
                }
                Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                    warn!(
                        store_id = sale.store_id,
                        attempt, %err,
                        "Sale allocation contended, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Looks up the pricing record for every distinct medicine on the
    /// sale. A medicine without pricing cannot be sold.
    async fn resolve_pricing(
        &self,
        sale: &NewSale,
    ) -> LedgerResult<HashMap<MedicineId, PricingRecord>> {
        let pricing_repo = self.db.pricing();
        let mut pricing = HashMap::new();

        for item in &sale.items {
            if pricing.contains_key(&item.medicine_id) {
                continue;
            }
            let record = pricing_repo
                .get(sale.store_id, item.medicine_id)
                .await?
                .ok_or_else(|| {
                    LedgerError::NotFound(format!(
                        "pricing not found for medicine {} at store {}",
                        item.medicine_id, sale.store_id
                    ))
                })?;
            pricing.insert(item.medicine_id, record);
        }

        Ok(pricing)
    }

    async fn write_sale(
        &self,
        sale: &NewSale,
        pricing: &HashMap<MedicineId, PricingRecord>,
        invoice_number: &str,
        today: NaiveDate,
    ) -> LedgerResult<SaleReceipt> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        // Expiring batches seen by planning; retired even on failure
        let mut observed_expired: Vec<(MedicineId, Vec<String>)> = Vec::new();
        let mut items: Vec<SaleItem> = Vec::with_capacity(sale.items.len());

        for line in &sale.items {
            let lots =
                StockRepository::active_lots_tx(&mut tx, sale.store_id, line.medicine_id).await?;

            let plan = match plan_allocation(&lots, line.quantity, today) {
                Ok(plan) => plan,
                Err(err) => {
                    // Business failure: undo every line, then persist
                    // the expiry observations separately. The failing
                    // line's own expired lots count as observed too.
                    drop(tx);
                    observed_expired.push((line.medicine_id, expired_batches(&lots, today)));
                    self.retire_observed(sale.store_id, &observed_expired, today)
                        .await;
                    return Err(err.into());
                }
            };

            if !plan.expired.is_empty() {
                observed_expired.push((line.medicine_id, plan.expired.clone()));
            }

            StockRepository::apply_allocation_tx(
                &mut tx,
                sale.store_id,
                line.medicine_id,
                &plan,
                today,
            )
            .await?;

            let record = &pricing[&line.medicine_id];
            let unit_price = record.sale_price();
            items.push(SaleItem {
                id: Uuid::new_v4().to_string(),
                medicine_id: line.medicine_id,
                quantity: line.quantity,
                unit_price,
                line_total: unit_price * line.quantity,
                consumptions: plan.consumptions,
            });
        }

        let total_amount: Money = items.iter().map(|item| item.line_total).sum();
        let record = SaleRecord {
            id: Uuid::new_v4().to_string(),
            store_id: sale.store_id,
            customer_id: sale.customer_id.clone(),
            sale_date: sale.sale_date,
            invoice_number: invoice_number.to_string(),
            total_amount,
            items,
            created_at: now,
        };

        SaleRepository::insert_tx(&mut tx, &record).await?;
        tx.commit().await.map_err(DbError::from)?;

        Ok(SaleReceipt {
            sale_id: record.id,
            invoice_number: record.invoice_number,
            total_amount,
            lines: record
                .items
                .into_iter()
                .map(|item| SaleReceiptLine {
                    medicine_id: item.medicine_id,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    line_total: item.line_total,
                    consumptions: item.consumptions,
                })
                .collect(),
        })
    }

    /// Retires expiry observations after a rolled-back sale. Failures
    /// here are logged, not surfaced: the caller's error is the
    /// allocation failure, and the lots stay retirable.
    async fn retire_observed(
        &self,
        store_id: StoreId,
        observed: &[(MedicineId, Vec<String>)],
        today: NaiveDate,
    ) {
        let stock = self.db.stock();
        for (medicine_id, batches) in observed {
            if batches.is_empty() {
                continue;
            }
            if let Err(err) = stock
                .retire_expired(store_id, *medicine_id, batches, today)
                .await
            {
                warn!(
                    store_id,
                    medicine_id, %err,
                    "Failed to retire expired batches after rollback"
                );
            }
        }
    }
}

/// Batch numbers of active lots inside the expiry window.
fn expired_batches(lots: &[Lot], today: NaiveDate) -> Vec<String> {
    lots.iter()
        .filter(|lot| lot.is_active && is_expiring(lot.expiry_date, today))
        .map(|lot| lot.batch_number.clone())
        .collect()
}
