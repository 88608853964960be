//! # Purchase Receiver
//!
//! Turns a validated purchase bill into ledger lots and an immutable
//! purchase record, atomically.
//!
//! ## Receipt Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Purchase Receipt                                   │
//! │                                                                         │
//! │   NewPurchase                                                           │
//! │      │ validate (shape, quantities, expiry-at-receipt)                  │
//! │      │ resolve references (store, distributor, medicines, mfrs)         │
//! │      ▼                                                                  │
//! │   lock_many (store, medicine) keys                                      │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │   BEGIN ───► receive_lot_tx per item ───► purchase insert ───► COMMIT  │
//! │                                                                         │
//! │   Any failure rolls the whole bill back; no partial receipt exists.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::locks::KeyLocks;
use crate::reference::{require, ReferenceData};
use pharma_core::{
    validate_new_purchase, EntityKind, Lot, MedicineId, Money, NewPurchase, PurchaseItem,
    PurchaseRecord, StoreId,
};
use pharma_db::{Database, DbError, PurchaseRepository, StockRepository};

// =============================================================================
// Constants
// =============================================================================

/// Attempts before a contended receipt is given up on.
const MAX_ATTEMPTS: u32 = 3;

/// Base backoff between attempts; grows linearly per attempt.
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

// =============================================================================
// Receipt
// =============================================================================

/// Summary returned to the caller after a successful receipt.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    /// Generated purchase record id (UUID v4).
    pub purchase_id: String,

    /// The distributor's bill number, echoed back.
    pub invoice_number: String,

    /// Sum of the per-item purchase amounts.
    pub total_amount: Money,

    /// Number of lots appended to ledgers.
    pub lots_received: usize,
}

// =============================================================================
// Purchase Receiver
// =============================================================================

/// Receives purchase bills into the batch ledger.
pub struct PurchaseReceiver {
    db: Database,
    reference: Arc<dyn ReferenceData>,
    ledger_locks: Arc<KeyLocks<(StoreId, MedicineId)>>,
}

impl PurchaseReceiver {
    /// Creates a receiver sharing `ledger_locks` with the sale allocator.
    pub fn new(
        db: Database,
        reference: Arc<dyn ReferenceData>,
        ledger_locks: Arc<KeyLocks<(StoreId, MedicineId)>>,
    ) -> Self {
        PurchaseReceiver {
            db,
            reference,
            ledger_locks,
        }
    }

    /// Receives a purchase bill: appends one lot per item and writes
    /// the purchase record in a single transaction.
    ///
    /// `today` is the receiving date; items expiring on or before it
    /// are rejected during validation.
    pub async fn receive(
        &self,
        purchase: NewPurchase,
        today: NaiveDate,
    ) -> LedgerResult<PurchaseReceipt> {
        validate_new_purchase(&purchase, today)?;
        let forms = self.check_references(&purchase).await?;

        // One guard per distinct ledger touched by this bill
        let keys: Vec<(StoreId, MedicineId)> = purchase
            .items
            .iter()
            .map(|item| (purchase.store_id, item.medicine_id))
            .collect();
        let _guards = self.ledger_locks.lock_many(&keys).await;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.write_receipt(&purchase, &forms, today).await {
                Ok(receipt) => {
                    info!(
                        purchase_id = %receipt.purchase_id,
                        store_id = purchase.store_id,
                        lots = receipt.lots_received,
                        total_paise = receipt.total_amount.paise(),
                        "Purchase received"
                    );
                    return Ok(receipt);
                }
                Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                    warn!(
                        store_id = purchase.store_id,
                        attempt, %err,
                        "Purchase receipt contended, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Verifies every referenced entity before the first write and
    /// resolves each medicine's dosage form for the ledger rows.
    async fn check_references(
        &self,
        purchase: &NewPurchase,
    ) -> LedgerResult<HashMap<MedicineId, String>> {
        require(&*self.reference, EntityKind::Store, purchase.store_id).await?;
        require(
            &*self.reference,
            EntityKind::Distributor,
            purchase.distributor_id,
        )
        .await?;

        let medicines: BTreeSet<i64> = purchase.items.iter().map(|i| i.medicine_id).collect();
        let mut forms = HashMap::with_capacity(medicines.len());
        for id in medicines {
            match self.reference.medicine_form(id).await? {
                Some(form) => {
                    forms.insert(id, form);
                }
                None => {
                    return Err(LedgerError::Validation(format!("Medicine not found: {id}")));
                }
            }
        }

        let manufacturers: BTreeSet<i64> =
            purchase.items.iter().map(|i| i.manufacturer_id).collect();
        for id in manufacturers {
            require(&*self.reference, EntityKind::Manufacturer, id).await?;
        }

        Ok(forms)
    }

    async fn write_receipt(
        &self,
        purchase: &NewPurchase,
        forms: &HashMap<MedicineId, String>,
        today: NaiveDate,
    ) -> LedgerResult<PurchaseReceipt> {
        let now = Utc::now();
        let total_amount: Money = purchase.items.iter().map(|i| i.purchase_amount).sum();

        let record = PurchaseRecord {
            id: Uuid::new_v4().to_string(),
            store_id: purchase.store_id,
            distributor_id: purchase.distributor_id,
            purchase_date: purchase.purchase_date,
            invoice_number: purchase.invoice_number.clone(),
            total_amount,
            items: purchase
                .items
                .iter()
                .map(|item| PurchaseItem {
                    id: Uuid::new_v4().to_string(),
                    medicine_id: item.medicine_id,
                    manufacturer_id: item.manufacturer_id,
                    batch_number: item.batch_number.clone(),
                    expiry_date: item.expiry_date,
                    quantity: item.quantity,
                    mrp: item.mrp,
                    discount: item.discount,
                    purchase_amount: item.purchase_amount,
                })
                .collect(),
            created_at: now,
        };

        let mut tx = self.db.begin().await?;

        for item in &purchase.items {
            let lot = Lot {
                batch_number: item.batch_number.clone(),
                expiry_date: item.expiry_date,
                quantity_received: item.quantity,
                remaining_quantity: item.quantity,
                is_active: true,
                created_at: now,
                updated_at: now,
            };
            let form = forms
                .get(&item.medicine_id)
                .map(String::as_str)
                .unwrap_or("tablet");
            StockRepository::receive_lot_tx(
                &mut tx,
                purchase.store_id,
                item.medicine_id,
                form,
                &lot,
                today,
            )
            .await?;
        }

        PurchaseRepository::insert_tx(&mut tx, &record).await?;
        tx.commit().await.map_err(DbError::from)?;

        Ok(PurchaseReceipt {
            purchase_id: record.id,
            invoice_number: record.invoice_number,
            total_amount,
            lots_received: purchase.items.len(),
        })
    }
}
