//! # Sale Repository
//!
//! Database operations for append-only sale records.
//!
//! ## Batch Breakdown
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sales            1 row per sale (invoice number, totals)              │
//! │    └─ sale_items        1 row per medicine line                        │
//! │         └─ sale_consumptions  1 row per (batch, quantity) consumed     │
//! │                                                                         │
//! │  The consumptions are what the FEFO allocator actually took from      │
//! │  each lot; they make a sale auditable against the ledger history.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use pharma_core::{BatchConsumption, Money, SaleItem, SaleRecord, StoreId};

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    store_id: i64,
    customer_id: String,
    sale_date: NaiveDate,
    invoice_number: String,
    total_amount_paise: i64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct SaleItemRow {
    id: String,
    medicine_id: i64,
    quantity: i64,
    unit_price_paise: i64,
    line_total_paise: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ConsumptionRow {
    batch_number: String,
    quantity: i64,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Inserts a sale record with its items and batch consumptions.
    ///
    /// Transaction-composable: the allocator writes the sale in the
    /// same transaction as the lot mutations it committed to.
    pub async fn insert_tx(conn: &mut SqliteConnection, sale: &SaleRecord) -> DbResult<()> {
        debug!(
            id = %sale.id,
            store_id = sale.store_id,
            invoice_number = %sale.invoice_number,
            items = sale.items.len(),
            "Inserting sale"
        );

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, store_id, customer_id, sale_date,
                invoice_number, total_amount_paise, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)
            "#,
        )
        .bind(&sale.id)
        .bind(sale.store_id)
        .bind(&sale.customer_id)
        .bind(sale.sale_date)
        .bind(&sale.invoice_number)
        .bind(sale.total_amount.paise())
        .bind(sale.created_at)
        .execute(&mut *conn)
        .await?;

        for item in &sale.items {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, medicine_id, quantity,
                    unit_price_paise, line_total_paise
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&item.id)
            .bind(&sale.id)
            .bind(item.medicine_id)
            .bind(item.quantity)
            .bind(item.unit_price.paise())
            .bind(item.line_total.paise())
            .execute(&mut *conn)
            .await?;

            for consumption in &item.consumptions {
                sqlx::query(
                    r#"
                    INSERT INTO sale_consumptions (
                        id, sale_item_id, batch_number, quantity
                    ) VALUES (?1, ?2, ?3, ?4)
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&item.id)
                .bind(&consumption.batch_number)
                .bind(consumption.quantity)
                .execute(&mut *conn)
                .await?;
            }
        }

        Ok(())
    }

    /// Gets a sale by id, items and consumptions included.
    pub async fn get(&self, id: &str) -> DbResult<Option<SaleRecord>> {
        let row: Option<SaleRow> = sqlx::query_as(
            r#"
            SELECT id, store_id, customer_id, sale_date,
                   invoice_number, total_amount_paise, created_at
            FROM sales
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

    /// Lists a store's sales, newest first.
    pub async fn list_by_store(&self, store_id: StoreId) -> DbResult<Vec<SaleRecord>> {
        let rows: Vec<SaleRow> = sqlx::query_as(
            r#"
            SELECT id, store_id, customer_id, sale_date,
                   invoice_number, total_amount_paise, created_at
            FROM sales
            WHERE store_id = ?1 AND is_active = 1
            ORDER BY sale_date DESC, created_at DESC
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        let mut sales = Vec::with_capacity(rows.len());
        for row in rows {
            sales.push(self.hydrate(row).await?);
        }
        Ok(sales)
    }

    /// Soft-deletes a sale record.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE sales SET is_active = 0 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        Ok(())
    }

    async fn hydrate(&self, row: SaleRow) -> DbResult<SaleRecord> {
        let item_rows: Vec<SaleItemRow> = sqlx::query_as(
            r#"
            SELECT id, medicine_id, quantity, unit_price_paise, line_total_paise
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        let mut items = Vec::with_capacity(item_rows.len());
        for item_row in item_rows {
            let consumptions: Vec<ConsumptionRow> = sqlx::query_as(
                r#"
                SELECT batch_number, quantity
                FROM sale_consumptions
                WHERE sale_item_id = ?1
                ORDER BY rowid
                "#,
            )
            .bind(&item_row.id)
            .fetch_all(&self.pool)
            .await?;

            items.push(SaleItem {
                id: item_row.id,
                medicine_id: item_row.medicine_id,
                quantity: item_row.quantity,
                unit_price: Money::from_paise(item_row.unit_price_paise),
                line_total: Money::from_paise(item_row.line_total_paise),
                consumptions: consumptions
                    .into_iter()
                    .map(|c| BatchConsumption {
                        batch_number: c.batch_number,
                        quantity: c.quantity,
                    })
                    .collect(),
            });
        }

        Ok(SaleRecord {
            id: row.id,
            store_id: row.store_id,
            customer_id: row.customer_id,
            sale_date: row.sale_date,
            invoice_number: row.invoice_number,
            total_amount: Money::from_paise(row.total_amount_paise),
            items,
            created_at: row.created_at,
        })
    }
}
