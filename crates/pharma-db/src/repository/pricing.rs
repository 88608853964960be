//! # Pricing Repository
//!
//! Current price/discount per (store, medicine). The computed sale
//! price is not stored; [`pharma_core::PricingRecord::sale_price`]
//! derives it on read.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use pharma_core::{DiscountRate, MedicineId, Money, PricingRecord, StoreId};

/// Repository for pricing database operations.
#[derive(Debug, Clone)]
pub struct PricingRepository {
    pool: SqlitePool,
}

#[derive(Debug, sqlx::FromRow)]
struct PricingRow {
    store_id: i64,
    medicine_id: i64,
    mrp_paise: i64,
    discount_bps: i32,
    net_rate_paise: i64,
    last_updated_by: String,
    is_active: bool,
    updated_at: DateTime<Utc>,
}

impl From<PricingRow> for PricingRecord {
    fn from(row: PricingRow) -> PricingRecord {
        PricingRecord {
            store_id: row.store_id,
            medicine_id: row.medicine_id,
            mrp: Money::from_paise(row.mrp_paise),
            discount: DiscountRate::from_bps(row.discount_bps),
            net_rate: Money::from_paise(row.net_rate_paise),
            last_updated_by: row.last_updated_by,
            is_active: row.is_active,
            updated_at: row.updated_at,
        }
    }
}

impl PricingRepository {
    /// Creates a new PricingRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PricingRepository { pool }
    }

    /// Inserts or replaces the pricing for a (store, medicine) pair.
    pub async fn upsert(
        &self,
        store_id: StoreId,
        medicine_id: MedicineId,
        mrp: Money,
        discount: DiscountRate,
        net_rate: Money,
        updated_by: &str,
    ) -> DbResult<()> {
        debug!(store_id, medicine_id, mrp = mrp.paise(), "Upserting pricing");

        sqlx::query(
            r#"
            INSERT INTO pricing (
                store_id, medicine_id, mrp_paise, discount_bps,
                net_rate_paise, last_updated_by, is_active, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)
            ON CONFLICT (store_id, medicine_id) DO UPDATE SET
                mrp_paise = excluded.mrp_paise,
                discount_bps = excluded.discount_bps,
                net_rate_paise = excluded.net_rate_paise,
                last_updated_by = excluded.last_updated_by,
                is_active = 1,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(store_id)
        .bind(medicine_id)
        .bind(mrp.paise())
        .bind(discount.bps())
        .bind(net_rate.paise())
        .bind(updated_by)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets the active pricing record for a (store, medicine) pair.
    pub async fn get(
        &self,
        store_id: StoreId,
        medicine_id: MedicineId,
    ) -> DbResult<Option<PricingRecord>> {
        let row: Option<PricingRow> = sqlx::query_as(
            r#"
            SELECT store_id, medicine_id, mrp_paise, discount_bps,
                   net_rate_paise, last_updated_by, is_active, updated_at
            FROM pricing
            WHERE store_id = ?1 AND medicine_id = ?2 AND is_active = 1
            "#,
        )
        .bind(store_id)
        .bind(medicine_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PricingRecord::from))
    }

    /// Soft-deletes the pricing for a (store, medicine) pair.
    pub async fn soft_delete(&self, store_id: StoreId, medicine_id: MedicineId) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE pricing SET
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
                "Pricing",
                format!("{store_id}/{medicine_id}"),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_upsert_get_roundtrip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let pricing = db.pricing();

        pricing
            .upsert(
                1,
                7,
                Money::from_paise(10_000),
                DiscountRate::from_bps(500),
                Money::from_paise(9_000),
                "tester",
            )
            .await
            .unwrap();

        let record = pricing.get(1, 7).await.unwrap().unwrap();
        assert_eq!(record.mrp, Money::from_paise(10_000));
        assert_eq!(record.sale_price(), Money::from_paise(9_500));

        // Upsert replaces
        pricing
            .upsert(
                1,
                7,
                Money::from_paise(12_000),
                DiscountRate::zero(),
                Money::from_paise(11_000),
                "tester",
            )
            .await
            .unwrap();
        let record = pricing.get(1, 7).await.unwrap().unwrap();
        assert_eq!(record.sale_price(), Money::from_paise(12_000));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_record() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let pricing = db.pricing();

        pricing
            .upsert(
                1,
                7,
                Money::from_paise(10_000),
                DiscountRate::zero(),
                Money::from_paise(9_000),
                "tester",
            )
            .await
            .unwrap();
        pricing.soft_delete(1, 7).await.unwrap();
        assert!(pricing.get(1, 7).await.unwrap().is_none());
    }
}
