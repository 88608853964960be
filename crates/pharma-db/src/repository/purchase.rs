//! # Purchase Repository
//!
//! Database operations for append-only purchase records.
//!
//! ## Immutability
//! A purchase is written once by the purchase receiver and never
//! updated; there is no update operation in this repository. Deletion
//! is a soft flag flip so reports can still resolve history.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use pharma_core::{
    DiscountRate, Money, PurchaseItem, PurchaseRecord, StoreId,
};

/// Repository for purchase database operations.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

#[derive(Debug, sqlx::FromRow)]
struct PurchaseRow {
    id: String,
    store_id: i64,
    distributor_id: i64,
    purchase_date: NaiveDate,
    invoice_number: String,
    total_amount_paise: i64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct PurchaseItemRow {
    id: String,
    medicine_id: i64,
    manufacturer_id: i64,
    batch_number: String,
    expiry_date: NaiveDate,
    quantity: i64,
    mrp_paise: i64,
    discount_bps: i32,
    purchase_amount_paise: i64,
}

impl From<PurchaseItemRow> for PurchaseItem {
    fn from(row: PurchaseItemRow) -> PurchaseItem {
        PurchaseItem {
            id: row.id,
            medicine_id: row.medicine_id,
            manufacturer_id: row.manufacturer_id,
            batch_number: row.batch_number,
            expiry_date: row.expiry_date,
            quantity: row.quantity,
            mrp: Money::from_paise(row.mrp_paise),
            discount: DiscountRate::from_bps(row.discount_bps),
            purchase_amount: Money::from_paise(row.purchase_amount_paise),
        }
    }
}

impl PurchaseRepository {
    /// Creates a new PurchaseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// Inserts a purchase record with its items.
    ///
    /// Transaction-composable: the purchase receiver writes the record
    /// in the same transaction as the lots it appends.
    pub async fn insert_tx(
        conn: &mut SqliteConnection,
        purchase: &PurchaseRecord,
    ) -> DbResult<()> {
        debug!(
            id = %purchase.id,
            store_id = purchase.store_id,
            invoice_number = %purchase.invoice_number,
            items = purchase.items.len(),
            "Inserting purchase"
        );

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, store_id, distributor_id, purchase_date,
                invoice_number, total_amount_paise, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)
            "#,
        )
        .bind(&purchase.id)
        .bind(purchase.store_id)
        .bind(purchase.distributor_id)
        .bind(purchase.purchase_date)
        .bind(&purchase.invoice_number)
        .bind(purchase.total_amount.paise())
        .bind(purchase.created_at)
        .execute(&mut *conn)
        .await?;

        for item in &purchase.items {
            sqlx::query(
                r#"
                INSERT INTO purchase_items (
                    id, purchase_id, medicine_id, manufacturer_id,
                    batch_number, expiry_date, quantity,
                    mrp_paise, discount_bps, purchase_amount_paise
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(&item.id)
            .bind(&purchase.id)
            .bind(item.medicine_id)
            .bind(item.manufacturer_id)
            .bind(&item.batch_number)
            .bind(item.expiry_date)
            .bind(item.quantity)
            .bind(item.mrp.paise())
            .bind(item.discount.bps())
            .bind(item.purchase_amount.paise())
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Gets a purchase by id, items included.
    pub async fn get(&self, id: &str) -> DbResult<Option<PurchaseRecord>> {
        let row: Option<PurchaseRow> = sqlx::query_as(
            r#"
            SELECT id, store_id, distributor_id, purchase_date,
                   invoice_number, total_amount_paise, created_at
            FROM purchases
            WHERE id = ?1 AND is_active = 1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(self.hydrate(row).await?))
    }

    /// Lists a store's purchases, newest first.
    pub async fn list_by_store(&self, store_id: StoreId) -> DbResult<Vec<PurchaseRecord>> {
        let rows: Vec<PurchaseRow> = sqlx::query_as(
            r#"
            SELECT id, store_id, distributor_id, purchase_date,
                   invoice_number, total_amount_paise, created_at
            FROM purchases
            WHERE store_id = ?1 AND is_active = 1
            ORDER BY purchase_date DESC, created_at DESC
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        let mut purchases = Vec::with_capacity(rows.len());
        for row in rows {
            purchases.push(self.hydrate(row).await?);
        }
        Ok(purchases)
    }

    /// Lists a store's purchases within a date range (inclusive).
    pub async fn list_by_store_between(
        &self,
        store_id: StoreId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<PurchaseRecord>> {
        let rows: Vec<PurchaseRow> = sqlx::query_as(
            r#"
            SELECT id, store_id, distributor_id, purchase_date,
                   invoice_number, total_amount_paise, created_at
            FROM purchases
            WHERE store_id = ?1 AND is_active = 1
              AND purchase_date >= ?2 AND purchase_date <= ?3
            ORDER BY purchase_date DESC, created_at DESC
            "#,
        )
        .bind(store_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let mut purchases = Vec::with_capacity(rows.len());
        for row in rows {
            purchases.push(self.hydrate(row).await?);
        }
        Ok(purchases)
    }

    /// Soft-deletes a purchase record.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE purchases SET is_active = 0 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase", id));
        }

        Ok(())
    }

    async fn hydrate(&self, row: PurchaseRow) -> DbResult<PurchaseRecord> {
        let items: Vec<PurchaseItemRow> = sqlx::query_as(
            r#"
            SELECT id, medicine_id, manufacturer_id, batch_number,
                   expiry_date, quantity, mrp_paise, discount_bps,
                   purchase_amount_paise
            FROM purchase_items
            WHERE purchase_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(PurchaseRecord {
            id: row.id,
            store_id: row.store_id,
            distributor_id: row.distributor_id,
            purchase_date: row.purchase_date,
            invoice_number: row.invoice_number,
            total_amount: Money::from_paise(row.total_amount_paise),
            items: items.into_iter().map(PurchaseItem::from).collect(),
            created_at: row.created_at,
        })
    }
}
