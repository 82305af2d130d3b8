//! Drug repository.

use sqlx::PgPool;

use pharmacy_core::DrugId;

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Drug, DrugFields, DrugListing};

/// Shown when a drug name is already in the formulary.
pub const DUPLICATE_DRUG: &str = "Drug already exists.";

const DRUG_COLUMNS: &str = r"
    drug_id AS id, drug_name AS name, generic_name, category_id, unit_of_measure,
    reorder_level, description, is_active, created_at, updated_at
";

/// Repository for drug database operations.
pub struct DrugRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DrugRepository<'a> {
    /// Create a new drug repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List drugs with category name and total stock across departments.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, include_inactive: bool) -> Result<Vec<DrugListing>, RepositoryError> {
        let drugs = sqlx::query_as::<_, DrugListing>(
            r"
            SELECT d.drug_id AS id, d.drug_name AS name, d.generic_name, d.category_id,
                   c.category_name, d.unit_of_measure, d.reorder_level, d.description,
                   d.is_active, COALESCE(SUM(i.quantity_in_stock), 0)::BIGINT AS total_stock
            FROM drugs d
            LEFT JOIN drug_categories c ON c.category_id = d.category_id
            LEFT JOIN inventory i ON i.drug_id = d.drug_id
            WHERE d.is_active OR $1
            GROUP BY d.drug_id, c.category_name
            ORDER BY d.drug_name
            ",
        )
        .bind(include_inactive)
        .fetch_all(self.pool)
        .await?;

        Ok(drugs)
    }

    /// List active drugs by name (for form selects).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Drug>, RepositoryError> {
        let drugs = sqlx::query_as::<_, Drug>(&format!(
            "SELECT {DRUG_COLUMNS} FROM drugs WHERE is_active ORDER BY drug_name"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(drugs)
    }

    /// Get a drug by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: DrugId) -> Result<Option<Drug>, RepositoryError> {
        let drug = sqlx::query_as::<_, Drug>(&format!(
            "SELECT {DRUG_COLUMNS} FROM drugs WHERE drug_id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(drug)
    }

    /// Count active drugs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_active(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM drugs WHERE is_active")
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    /// Create a drug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create(&self, fields: &DrugFields) -> Result<Drug, RepositoryError> {
        sqlx::query_as::<_, Drug>(&format!(
            r"
            INSERT INTO drugs (drug_name, generic_name, category_id, unit_of_measure,
                               reorder_level, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {DRUG_COLUMNS}
            "
        ))
        .bind(&fields.name)
        .bind(&fields.generic_name)
        .bind(fields.category_id)
        .bind(&fields.unit_of_measure)
        .bind(fields.reorder_level)
        .bind(&fields.description)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique(DUPLICATE_DRUG))
    }

    /// Update a drug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the drug doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new name is taken.
    pub async fn update(&self, id: DrugId, fields: &DrugFields) -> Result<Drug, RepositoryError> {
        sqlx::query_as::<_, Drug>(&format!(
            r"
            UPDATE drugs
            SET drug_name = $2, generic_name = $3, category_id = $4, unit_of_measure = $5,
                reorder_level = $6, description = $7, updated_at = NOW()
            WHERE drug_id = $1
            RETURNING {DRUG_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.generic_name)
        .bind(fields.category_id)
        .bind(&fields.unit_of_measure)
        .bind(fields.reorder_level)
        .bind(&fields.description)
        .fetch_optional(self.pool)
        .await
        .map_err(conflict_on_unique(DUPLICATE_DRUG))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Count inventory batches (including empty ones) for a drug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_inventory(&self, id: DrugId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory WHERE drug_id = $1")
            .bind(id)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    /// Mark a drug inactive.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the drug doesn't exist.
    pub async fn deactivate(&self, id: DrugId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE drugs SET is_active = FALSE, updated_at = NOW() WHERE drug_id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
