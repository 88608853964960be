//! # Reference Data Repository
//!
//! Master-data lookups: stores, medicines, manufacturers, distributors.
//!
//! In this deployment the reference data lives in the same SQLite file,
//! but use cases only ever reach it through the `ReferenceData` trait
//! in pharma-ledger, so the lookup side stays swappable. The insert
//! side exists for store onboarding and the seed binary.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use pharma_core::{
    DistributorId, EntityKind, ManufacturerId, MedicineId, StoreId, Substitute,
};

/// Repository for reference-data lookups and master inserts.
#[derive(Debug, Clone)]
pub struct ReferenceRepository {
    pool: SqlitePool,
}

/// (table, id column, name column) per entity kind.
fn table_of(kind: EntityKind) -> (&'static str, &'static str, &'static str) {
    match kind {
        EntityKind::Store => ("stores", "store_id", "store_name"),
        EntityKind::Medicine => ("medicines", "medicine_id", "medicine_name"),
        EntityKind::Manufacturer => ("manufacturers", "manufacturer_id", "manufacturer_name"),
        EntityKind::Distributor => ("distributors", "distributor_id", "distributor_name"),
    }
}

impl ReferenceRepository {
    /// Creates a new ReferenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReferenceRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Lookups (the ReferenceData boundary)
    // -------------------------------------------------------------------------

    /// Whether an active entity with this id exists.
    pub async fn exists(&self, kind: EntityKind, id: i64) -> DbResult<bool> {
        let (table, id_col, _) = table_of(kind);
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {table} WHERE {id_col} = ?1 AND is_active = 1"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Resolves an entity's display name, `None` when unknown/inactive.
    pub async fn name_of(&self, kind: EntityKind, id: i64) -> DbResult<Option<String>> {
        let (table, id_col, name_col) = table_of(kind);
        let name: Option<String> = sqlx::query_scalar(&format!(
            "SELECT {name_col} FROM {table} WHERE {id_col} = ?1 AND is_active = 1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(name)
    }

    /// Dosage form of a medicine (`None` when unknown/inactive).
    pub async fn medicine_form(&self, medicine_id: MedicineId) -> DbResult<Option<String>> {
        let form: Option<String> = sqlx::query_scalar(
            "SELECT medicine_form FROM medicines WHERE medicine_id = ?1 AND is_active = 1",
        )
        .bind(medicine_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(form)
    }

    /// Medicines sharing this medicine's composition (excluding itself).
    pub async fn substitutes(&self, medicine_id: MedicineId) -> DbResult<Vec<Substitute>> {
        #[derive(sqlx::FromRow)]
        struct SubRow {
            medicine_id: i64,
            medicine_name: String,
        }

        let rows: Vec<SubRow> = sqlx::query_as(
            r#"
            SELECT m.medicine_id, m.medicine_name
            FROM medicines m
            JOIN medicines src ON src.composition = m.composition
            WHERE src.medicine_id = ?1
              AND m.medicine_id != ?1
              AND m.is_active = 1
              AND m.composition != ''
            ORDER BY m.medicine_name
            "#,
        )
        .bind(medicine_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Substitute {
                medicine_id: r.medicine_id,
                medicine_name: r.medicine_name,
            })
            .collect())
    }

    // -------------------------------------------------------------------------
    // Master inserts (store onboarding, seed binary)
    // -------------------------------------------------------------------------

    /// Registers a store and returns its id.
    pub async fn create_store(&self, name: &str) -> DbResult<StoreId> {
        debug!(name, "Creating store");
        let result = sqlx::query(
            "INSERT INTO stores (store_name, is_active, created_at) VALUES (?1, 1, ?2)",
        )
        .bind(name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("store_name", name),
            other => other,
        })?;

        Ok(result.last_insert_rowid())
    }

    /// Registers a manufacturer and returns its id.
    pub async fn create_manufacturer(&self, name: &str) -> DbResult<ManufacturerId> {
        let result = sqlx::query(
            "INSERT INTO manufacturers (manufacturer_name, is_active, created_at) VALUES (?1, 1, ?2)",
        )
        .bind(name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("manufacturer_name", name),
            other => other,
        })?;

        Ok(result.last_insert_rowid())
    }

    /// Registers a distributor and returns its id.
    pub async fn create_distributor(&self, name: &str) -> DbResult<DistributorId> {
        let result = sqlx::query(
            "INSERT INTO distributors (distributor_name, is_active, created_at) VALUES (?1, 1, ?2)",
        )
        .bind(name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("distributor_name", name),
            other => other,
        })?;

        Ok(result.last_insert_rowid())
    }

    /// Registers a medicine catalog entry and returns its id.
    pub async fn create_medicine(
        &self,
        name: &str,
        composition: &str,
        manufacturer_id: ManufacturerId,
        medicine_form: &str,
    ) -> DbResult<MedicineId> {
        let result = sqlx::query(
            r#"
            INSERT INTO medicines (
                medicine_name, composition, manufacturer_id,
                medicine_form, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, 1, ?5)
            "#,
        )
        .bind(name)
        .bind(composition)
        .bind(manufacturer_id)
        .bind(medicine_form)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("medicine_name", name),
            other => other,
        })?;

        Ok(result.last_insert_rowid())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
