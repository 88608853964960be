//! # Invoice Sequence Repository
//!
//! One row per store holding the last issued sale invoice number.
//! Seeded once at store setup; advanced exactly once per sale. The
//! newest value always wins and the value never goes backwards.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use pharma_core::StoreId;

/// Repository for per-store invoice sequences.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Seeds the sequence for a store. Insert-only: seeding twice for
    /// one store fails with a unique violation.
    pub async fn seed(&self, store_id: StoreId, first_value: &str) -> DbResult<()> {
        debug!(store_id, first_value, "Seeding invoice sequence");

        sqlx::query(
            r#"
            INSERT INTO invoice_sequences (store_id, last_invoice_number, updated_at)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(store_id)
        .bind(first_value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("invoice_sequences.store_id", store_id.to_string())
            }
            other => other,
        })?;

        Ok(())
    }

    /// Returns the last issued invoice number for a store, or `None`
    /// if the store was never seeded.
    pub async fn last_invoice(&self, store_id: StoreId) -> DbResult<Option<String>> {
        let last: Option<String> = sqlx::query_scalar(
            r#"
            SELECT last_invoice_number
            FROM invoice_sequences
            WHERE store_id = ?1
            "#,
        )
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(last)
    }

    /// Persists a newly issued invoice number as the store's last.
    ///
    /// Guarded by the expected previous value: with the sequencer's
    /// per-store lock this never misses, but the guard turns any
    /// unexpected interleaving into an error instead of a lost update.
    pub async fn advance(
        &self,
        store_id: StoreId,
        previous: &str,
        next: &str,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE invoice_sequences SET
                last_invoice_number = ?3,
                updated_at = ?4
            WHERE store_id = ?1 AND last_invoice_number = ?2
            "#,
        )
        .bind(store_id)
        .bind(previous)
        .bind(next)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Busy(format!(
                "invoice sequence for store {store_id} advanced concurrently"
            )));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::reference::ReferenceRepository;

    async fn db_with_store() -> (Database, StoreId) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let store_id = ReferenceRepository::new(db.pool().clone())
            .create_store("Main Street Pharmacy")
            .await
            .unwrap();
        (db, store_id)
    }

    #[tokio::test]
    async fn test_seed_then_advance() {
        let (db, store_id) = db_with_store().await;
        let invoices = db.invoices();

        invoices.seed(store_id, "INV00000").await.unwrap();
        assert_eq!(
            invoices.last_invoice(store_id).await.unwrap().as_deref(),
            Some("INV00000")
        );

        invoices.advance(store_id, "INV00000", "INV00001").await.unwrap();
        assert_eq!(
            invoices.last_invoice(store_id).await.unwrap().as_deref(),
            Some("INV00001")
        );
    }

    #[tokio::test]
    async fn test_double_seed_rejected() {
        let (db, store_id) = db_with_store().await;
        let invoices = db.invoices();

        invoices.seed(store_id, "INV00000").await.unwrap();
        let err = invoices.seed(store_id, "INV00000").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_unseeded_store_has_no_last() {
        let (db, store_id) = db_with_store().await;
        assert!(db.invoices().last_invoice(store_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_advance_fails() {
        let (db, store_id) = db_with_store().await;
        let invoices = db.invoices();

        invoices.seed(store_id, "INV00000").await.unwrap();
        invoices.advance(store_id, "INV00000", "INV00001").await.unwrap();

        let err = invoices
            .advance(store_id, "INV00000", "INV00001")
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
