//! # Stock Repository
//!
//! Database operations for the batch ledger: one aggregate per
//! (store, medicine), with its lots as child rows.
//!
//! ## The available_stock Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │            available_stock is DERIVED, never incremented                │
//! │                                                                         │
//! │  ❌ WRONG: independent counter (drifts from the lots)                  │
//! │     UPDATE stock_ledgers SET available_stock = available_stock - 3     │
//! │                                                                         │
//! │  ✅ CORRECT: rebuild from sellable lots, same transaction as the       │
//! │     lot mutation that invalidated it                                    │
//! │     UPDATE stock_ledgers SET available_stock =                         │
//! │         (SELECT SUM(remaining_quantity) FROM stock_lots                │
//! │          WHERE ... is_active = 1 AND expiry_date > today + 30d)        │
//! │                                                                         │
//! │  Every mutation path here (receive_lot_tx, apply_allocation_tx,        │
//! │  deactivate_lot_tx) ends with rebuild_available_stock_tx.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use pharma_core::fefo::EXPIRY_WINDOW_DAYS;
use pharma_core::{AllocationPlan, Lot, MedicineId, StockLedger, StoreId};

/// Repository for batch ledger database operations.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

/// Row shape of `stock_lots`.
#[derive(Debug, sqlx::FromRow)]
struct LotRow {
    batch_number: String,
    expiry_date: NaiveDate,
    quantity_received: i64,
    remaining_quantity: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LotRow> for Lot {
    fn from(row: LotRow) -> Lot {
        Lot {
            batch_number: row.batch_number,
            expiry_date: row.expiry_date,
            quantity_received: row.quantity_received,
            remaining_quantity: row.remaining_quantity,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Row shape of `stock_ledgers`.
#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    store_id: i64,
    medicine_id: i64,
    medicine_form: String,
    available_stock: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// First day beyond the expiry window: sellable lots expire strictly
/// after this date.
fn sellable_cutoff(today: NaiveDate) -> NaiveDate {
    today + Duration::days(EXPIRY_WINDOW_DAYS)
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Receiving
    // -------------------------------------------------------------------------

    /// Appends a lot to a ledger, creating the ledger on first receipt.
    ///
    /// Single atomic write: the ledger upsert, the lot insert, and the
    /// stock-total rebuild commit together.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - batch number already exists in this ledger
    pub async fn receive_lot(
        &self,
        store_id: StoreId,
        medicine_id: MedicineId,
        medicine_form: &str,
        lot: &Lot,
        today: NaiveDate,
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::receive_lot_tx(&mut tx, store_id, medicine_id, medicine_form, lot, today).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Transaction-composable form of [`receive_lot`](Self::receive_lot).
    pub async fn receive_lot_tx(
        conn: &mut SqliteConnection,
        store_id: StoreId,
        medicine_id: MedicineId,
        medicine_form: &str,
        lot: &Lot,
        today: NaiveDate,
    ) -> DbResult<()> {
        debug!(
            store_id,
            medicine_id,
            batch_number = %lot.batch_number,
            quantity = lot.quantity_received,
            "Receiving lot"
        );

        let now = Utc::now();

        // Upsert the owning ledger; receipt revives a deactivated one
        sqlx::query(
            r#"
            INSERT INTO stock_ledgers (
                store_id, medicine_id, medicine_form,
                available_stock, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, 0, 1, ?4, ?4)
            ON CONFLICT (store_id, medicine_id) DO UPDATE SET
                is_active = 1,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(store_id)
        .bind(medicine_id)
        .bind(medicine_form)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO stock_lots (
                store_id, medicine_id, batch_number, expiry_date,
                quantity_received, remaining_quantity, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
        )
        .bind(store_id)
        .bind(medicine_id)
        .bind(&lot.batch_number)
        .bind(lot.expiry_date)
        .bind(lot.quantity_received)
        .bind(lot.remaining_quantity)
        .bind(lot.is_active)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("batch_number", &lot.batch_number)
            }
            other => other,
        })?;

        Self::rebuild_available_stock_tx(conn, store_id, medicine_id, today).await
    }

    // -------------------------------------------------------------------------
    // Reading
    // -------------------------------------------------------------------------

    /// Returns the active lots of a ledger, ascending by expiry date,
    /// ties broken by batch number for determinism.
    ///
    /// Expiry filtering is deliberately NOT done here: the FEFO planner
    /// owns the expiry-window rules and must see expired lots so it can
    /// retire them. An empty result means no sellable history exists.
    pub async fn active_lots(
        &self,
        store_id: StoreId,
        medicine_id: MedicineId,
    ) -> DbResult<Vec<Lot>> {
        let mut conn = self.pool.acquire().await?;
        Self::active_lots_tx(&mut conn, store_id, medicine_id).await
    }

    /// Transaction-composable form of [`active_lots`](Self::active_lots).
    pub async fn active_lots_tx(
        conn: &mut SqliteConnection,
        store_id: StoreId,
        medicine_id: MedicineId,
    ) -> DbResult<Vec<Lot>> {
        let rows: Vec<LotRow> = sqlx::query_as(
            r#"
            SELECT
                batch_number, expiry_date,
                quantity_received, remaining_quantity,
                is_active, created_at, updated_at
            FROM stock_lots
            WHERE store_id = ?1 AND medicine_id = ?2 AND is_active = 1
            ORDER BY expiry_date, batch_number
            "#,
        )
        .bind(store_id)
        .bind(medicine_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(Lot::from).collect())
    }

    /// Returns the full ledger (active and inactive lots plus the
    /// cached total), or `None` if no ledger exists for the key.
    pub async fn snapshot(
        &self,
        store_id: StoreId,
        medicine_id: MedicineId,
    ) -> DbResult<Option<StockLedger>> {
        let ledger: Option<LedgerRow> = sqlx::query_as(
            r#"
            SELECT
                store_id, medicine_id, medicine_form,
                available_stock, is_active, created_at, updated_at
            FROM stock_ledgers
            WHERE store_id = ?1 AND medicine_id = ?2
            "#,
        )
        .bind(store_id)
        .bind(medicine_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(ledger) = ledger else {
            return Ok(None);
        };

        let rows: Vec<LotRow> = sqlx::query_as(
            r#"
            SELECT
                batch_number, expiry_date,
                quantity_received, remaining_quantity,
                is_active, created_at, updated_at
            FROM stock_lots
            WHERE store_id = ?1 AND medicine_id = ?2
            ORDER BY expiry_date, batch_number
            "#,
        )
        .bind(store_id)
        .bind(medicine_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(StockLedger {
            store_id: ledger.store_id,
            medicine_id: ledger.medicine_id,
            medicine_form: ledger.medicine_form,
            available_stock: ledger.available_stock,
            is_active: ledger.is_active,
            lots: rows.into_iter().map(Lot::from).collect(),
            created_at: ledger.created_at,
            updated_at: ledger.updated_at,
        }))
    }

    /// Lists every ledger of a store (for the stock overview).
    pub async fn ledgers_by_store(&self, store_id: StoreId) -> DbResult<Vec<StockLedger>> {
        let ledgers: Vec<LedgerRow> = sqlx::query_as(
            r#"
            SELECT
                store_id, medicine_id, medicine_form,
                available_stock, is_active, created_at, updated_at
            FROM stock_ledgers
            WHERE store_id = ?1 AND is_active = 1
            ORDER BY medicine_id
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(ledgers.len());
        for ledger in ledgers {
            let rows: Vec<LotRow> = sqlx::query_as(
                r#"
                SELECT
                    batch_number, expiry_date,
                    quantity_received, remaining_quantity,
                    is_active, created_at, updated_at
                FROM stock_lots
                WHERE store_id = ?1 AND medicine_id = ?2
                ORDER BY expiry_date, batch_number
                "#,
            )
            .bind(ledger.store_id)
            .bind(ledger.medicine_id)
            .fetch_all(&self.pool)
            .await?;

            result.push(StockLedger {
                store_id: ledger.store_id,
                medicine_id: ledger.medicine_id,
                medicine_form: ledger.medicine_form,
                available_stock: ledger.available_stock,
                is_active: ledger.is_active,
                lots: rows.into_iter().map(Lot::from).collect(),
                created_at: ledger.created_at,
                updated_at: ledger.updated_at,
            });
        }

        Ok(result)
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Sets a lot inactive. Idempotent: deactivating an already-inactive
    /// or unknown batch is a no-op.
    pub async fn deactivate_lot(
        &self,
        store_id: StoreId,
        medicine_id: MedicineId,
        batch_number: &str,
        today: NaiveDate,
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::deactivate_lot_tx(&mut tx, store_id, medicine_id, batch_number).await?;
        Self::rebuild_available_stock_tx(&mut tx, store_id, medicine_id, today).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Transaction-composable lot deactivation (no stock rebuild; the
    /// composing caller rebuilds once at the end).
    pub async fn deactivate_lot_tx(
        conn: &mut SqliteConnection,
        store_id: StoreId,
        medicine_id: MedicineId,
        batch_number: &str,
    ) -> DbResult<()> {
        debug!(store_id, medicine_id, batch_number, "Deactivating lot");

        sqlx::query(
            r#"
            UPDATE stock_lots SET
                is_active = 0,
                updated_at = ?4
            WHERE store_id = ?1 AND medicine_id = ?2 AND batch_number = ?3
              AND is_active = 1
            "#,
        )
        .bind(store_id)
        .bind(medicine_id)
        .bind(batch_number)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Applies a FEFO allocation plan: decrements each consumed lot,
    /// deactivates the expired ones, and rebuilds the cached total.
    ///
    /// Runs inside the caller's transaction so that a multi-medicine
    /// sale commits all-or-nothing.
    pub async fn apply_allocation_tx(
        conn: &mut SqliteConnection,
        store_id: StoreId,
        medicine_id: MedicineId,
        plan: &AllocationPlan,
        today: NaiveDate,
    ) -> DbResult<()> {
        let now = Utc::now();

        for consumption in &plan.consumptions {
            let result = sqlx::query(
                r#"
                UPDATE stock_lots SET
                    remaining_quantity = remaining_quantity - ?4,
                    updated_at = ?5
                WHERE store_id = ?1 AND medicine_id = ?2 AND batch_number = ?3
                  AND is_active = 1 AND remaining_quantity >= ?4
                "#,
            )
            .bind(store_id)
            .bind(medicine_id)
            .bind(&consumption.batch_number)
            .bind(consumption.quantity)
            .bind(now)
            .execute(&mut *conn)
            .await?;

            // The plan was computed from this same transaction's view;
            // a miss means the invariant is broken, not a race
            if result.rows_affected() == 0 {
                return Err(DbError::Internal(format!(
                    "allocation plan no longer matches lot {}/{}/{}",
                    store_id, medicine_id, consumption.batch_number
                )));
            }
        }

        for batch_number in &plan.expired {
            Self::deactivate_lot_tx(conn, store_id, medicine_id, batch_number).await?;
        }

        Self::rebuild_available_stock_tx(conn, store_id, medicine_id, today).await
    }

    /// Deactivates the expired batches of a plan outside any sale.
    ///
    /// Used after a failed allocation: the sale is rolled back, but the
    /// expiry observations still hold and are persisted separately.
    pub async fn retire_expired(
        &self,
        store_id: StoreId,
        medicine_id: MedicineId,
        batch_numbers: &[String],
        today: NaiveDate,
    ) -> DbResult<()> {
        if batch_numbers.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for batch_number in batch_numbers {
            Self::deactivate_lot_tx(&mut tx, store_id, medicine_id, batch_number).await?;
        }
        Self::rebuild_available_stock_tx(&mut tx, store_id, medicine_id, today).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Recomputes the cached `available_stock` from sellable lots:
    /// active, with expiry strictly beyond the 30-day window.
    ///
    /// Must run in the same transaction as the lot mutation that
    /// invalidated the cache.
    pub async fn rebuild_available_stock_tx(
        conn: &mut SqliteConnection,
        store_id: StoreId,
        medicine_id: MedicineId,
        today: NaiveDate,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE stock_ledgers SET
                available_stock = (
                    SELECT COALESCE(SUM(remaining_quantity), 0)
                    FROM stock_lots
                    WHERE store_id = ?1 AND medicine_id = ?2
                      AND is_active = 1 AND expiry_date > ?3
                ),
                updated_at = ?4
            WHERE store_id = ?1 AND medicine_id = ?2
            "#,
        )
        .bind(store_id)
        .bind(medicine_id)
        .bind(sellable_cutoff(today))
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(
                "StockLedger",
                format!("{store_id}/{medicine_id}"),
            ));
        }

        Ok(())
    }

    /// Soft-deactivates a whole ledger.
    pub async fn soft_delete(&self, store_id: StoreId, medicine_id: MedicineId) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE stock_ledgers SET
                is_active = 0,
                updated_at = ?3
            WHERE store_id = ?1 AND medicine_id = ?2
            "#,
        )
        .bind(store_id)
        .bind(medicine_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(
                "StockLedger",
                format!("{store_id}/{medicine_id}"),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
