//! # Invoice Sequencer
//!
//! Issues the next invoice number for a store.
//!
//! ## Issuance Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Invoice Issuance                                    │
//! │                                                                         │
//! │   lock(store)                                                           │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │   read last_invoice_number        e.g. "INV00042"                       │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │   compute successor               "INV00043" (width preserved)          │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │   UPDATE ... WHERE last = prev    guard catches foreign writers         │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │   return "INV00043"                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The per-store lock serializes issuance within this process; the
//! guarded UPDATE catches writers outside it (a second process on the
//! same file). A guard miss surfaces as `Busy` and is retried.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::locks::KeyLocks;
use pharma_core::{next_invoice_number, StoreId};
use pharma_db::InvoiceRepository;

// =============================================================================
// Constants
// =============================================================================

/// Attempts before a contended issuance is given up on.
const MAX_ATTEMPTS: u32 = 3;

/// Base backoff between attempts; grows linearly per attempt.
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

// =============================================================================
// Invoice Sequencer
// =============================================================================

/// Issues strictly increasing invoice numbers per store.
pub struct InvoiceSequencer {
    invoices: InvoiceRepository,
    store_locks: Arc<KeyLocks<StoreId>>,
}

impl InvoiceSequencer {
    /// Creates a sequencer over the invoice repository.
    pub fn new(invoices: InvoiceRepository) -> Self {
        InvoiceSequencer {
            invoices,
            store_locks: Arc::new(KeyLocks::new()),
        }
    }

    /// Issues the next invoice number for `store_id`.
    ///
    /// The sequence must have been seeded at store setup; an unseeded
    /// store is an error, never an implicit `INV0`.
    pub async fn next_invoice(&self, store_id: StoreId) -> LedgerResult<String> {
        let _guard = self.store_locks.lock(&store_id).await;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_issue(store_id).await {
                Ok(next) => return Ok(next),
                Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                    warn!(store_id, attempt, %err, "Invoice issuance contended, retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn try_issue(&self, store_id: StoreId) -> LedgerResult<String> {
        let last = self
            .invoices
            .last_invoice(store_id)
            .await?
            .ok_or_else(|| {
                LedgerError::NotFound(format!("invoice sequence not seeded for store {store_id}"))
            })?;

        let next = next_invoice_number(&last)?;
        self.invoices.advance(store_id, &last, &next).await?;

        debug!(store_id, %last, %next, "Issued invoice number");
        Ok(next)
    }
}
