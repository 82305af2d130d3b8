//! Supplier repository.

use sqlx::PgPool;

use pharmacy_core::SupplierId;

use super::{RepositoryError, conflict_on_reference, conflict_on_unique};
use crate::models::{Supplier, SupplierFields};

const DUPLICATE_SUPPLIER: &str = "Supplier already exists.";
/// Shown when purchases still reference a supplier.
pub const SUPPLIER_IN_USE: &str = "Cannot delete supplier - they have purchase records.";

const SELECT_SUPPLIER: &str = r"
    SELECT supplier_id AS id, supplier_name AS name, contact_person,
           contact_phone, email, address, is_active
    FROM suppliers
";

/// Repository for supplier database operations.
pub struct SupplierRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SupplierRepository<'a> {
    /// Create a new supplier repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all suppliers by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Supplier>, RepositoryError> {
        let suppliers =
            sqlx::query_as::<_, Supplier>(&format!("{SELECT_SUPPLIER} ORDER BY supplier_name"))
                .fetch_all(self.pool)
                .await?;

        Ok(suppliers)
    }

    /// List active suppliers by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Supplier>, RepositoryError> {
        let suppliers = sqlx::query_as::<_, Supplier>(&format!(
            "{SELECT_SUPPLIER} WHERE is_active ORDER BY supplier_name"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(suppliers)
    }

    /// Get a supplier by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: SupplierId) -> Result<Option<Supplier>, RepositoryError> {
        let supplier =
            sqlx::query_as::<_, Supplier>(&format!("{SELECT_SUPPLIER} WHERE supplier_id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(supplier)
    }

    /// Create a supplier.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create(&self, fields: &SupplierFields) -> Result<Supplier, RepositoryError> {
        sqlx::query_as::<_, Supplier>(
            r"
            INSERT INTO suppliers (supplier_name, contact_person, contact_phone, email, address, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING supplier_id AS id, supplier_name AS name, contact_person,
                      contact_phone, email, address, is_active
            ",
        )
        .bind(&fields.name)
        .bind(&fields.contact_person)
        .bind(&fields.contact_phone)
        .bind(&fields.email)
        .bind(&fields.address)
        .bind(fields.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique(DUPLICATE_SUPPLIER))
    }

    /// Update a supplier.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the supplier doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new name is taken.
    pub async fn update(
        &self,
        id: SupplierId,
        fields: &SupplierFields,
    ) -> Result<Supplier, RepositoryError> {
        sqlx::query_as::<_, Supplier>(
            r"
            UPDATE suppliers
            SET supplier_name = $2, contact_person = $3, contact_phone = $4,
                email = $5, address = $6, is_active = $7
            WHERE supplier_id = $1
            RETURNING supplier_id AS id, supplier_name AS name, contact_person,
                      contact_phone, email, address, is_active
            ",
        )
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.contact_person)
        .bind(&fields.contact_phone)
        .bind(&fields.email)
        .bind(&fields.address)
        .bind(fields.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(conflict_on_unique(DUPLICATE_SUPPLIER))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Count purchases recorded against a supplier.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_purchases(&self, id: SupplierId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchases WHERE supplier_id = $1")
            .bind(id)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    /// Delete a supplier.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the supplier doesn't exist.
    /// Returns `RepositoryError::Conflict` if a purchase still references it.
    pub async fn delete(&self, id: SupplierId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM suppliers WHERE supplier_id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(conflict_on_reference(SUPPLIER_IN_USE))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
