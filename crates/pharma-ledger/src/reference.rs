//! # Reference Data Boundary
//!
//! The use-case layer never queries master tables directly; it goes
//! through this trait so the reference store can live elsewhere (a
//! separate service, a cache) without touching the use cases.

use async_trait::async_trait;

use crate::error::{LedgerError, LedgerResult};
use pharma_core::{EntityKind, MedicineId, Substitute, ValidationError};
use pharma_db::ReferenceRepository;

// =============================================================================
// Trait
// =============================================================================

/// Read-only access to reference data (stores, medicines, ...).
#[async_trait]
pub trait ReferenceData: Send + Sync {
    /// Whether an active entity with this id exists.
    async fn exists(&self, kind: EntityKind, id: i64) -> LedgerResult<bool>;

    /// Resolves an entity's display name, `None` when unknown.
    async fn name_of(&self, kind: EntityKind, id: i64) -> LedgerResult<Option<String>>;

    /// Dosage form of a medicine (`None` when unknown).
    async fn medicine_form(&self, medicine_id: MedicineId) -> LedgerResult<Option<String>>;

    /// Medicines sharing this medicine's composition.
    async fn substitutes(&self, medicine_id: MedicineId) -> LedgerResult<Vec<Substitute>>;
}

/// Checks one reference and reports `UnknownReference` when absent.
pub(crate) async fn require(
    reference: &dyn ReferenceData,
    kind: EntityKind,
    id: i64,
) -> LedgerResult<()> {
    if reference.exists(kind, id).await? {
        Ok(())
    } else {
        Err(LedgerError::from(ValidationError::UnknownReference {
            entity: kind.as_str().to_string(),
            id: id.to_string(),
        }))
    }
}

// =============================================================================
// SQLite Implementation
// =============================================================================

#[async_trait]
impl ReferenceData for ReferenceRepository {
    async fn exists(&self, kind: EntityKind, id: i64) -> LedgerResult<bool> {
        Ok(ReferenceRepository::exists(self, kind, id).await?)
    }

    async fn name_of(&self, kind: EntityKind, id: i64) -> LedgerResult<Option<String>> {
        Ok(ReferenceRepository::name_of(self, kind, id).await?)
    }

    async fn medicine_form(&self, medicine_id: MedicineId) -> LedgerResult<Option<String>> {
        Ok(ReferenceRepository::medicine_form(self, medicine_id).await?)
    }

    async fn substitutes(&self, medicine_id: MedicineId) -> LedgerResult<Vec<Substitute>> {
        Ok(ReferenceRepository::substitutes(self, medicine_id).await?)
    }
}
