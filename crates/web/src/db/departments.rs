//! Department repository.

use sqlx::PgPool;

use pharmacy_core::DepartmentId;

use super::{RepositoryError, conflict_on_reference, conflict_on_unique};
use crate::models::{Department, DepartmentFields};

const DUPLICATE_DEPARTMENT: &str = "Department already exists.";
/// Shown when stock, users or transactions still reference a department.
pub const DEPARTMENT_IN_USE: &str =
    "Cannot delete department - it has inventory, users or transactions. Deactivate it instead.";

const SELECT_DEPARTMENT: &str = r"
    SELECT department_id AS id, department_name AS name, location,
           contact_person, contact_phone, is_active
    FROM departments
";

/// Repository for department database operations.
pub struct DepartmentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DepartmentRepository<'a> {
    /// Create a new department repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all departments by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Department>, RepositoryError> {
        let departments =
            sqlx::query_as::<_, Department>(&format!("{SELECT_DEPARTMENT} ORDER BY department_name"))
                .fetch_all(self.pool)
                .await?;

        Ok(departments)
    }

    /// List active departments by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Department>, RepositoryError> {
        let departments = sqlx::query_as::<_, Department>(&format!(
            "{SELECT_DEPARTMENT} WHERE is_active ORDER BY department_name"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(departments)
    }

    /// Get a department by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: DepartmentId) -> Result<Option<Department>, RepositoryError> {
        let department = sqlx::query_as::<_, Department>(&format!(
            "{SELECT_DEPARTMENT} WHERE department_id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(department)
    }

    /// Create a department.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create(&self, fields: &DepartmentFields) -> Result<Department, RepositoryError> {
        sqlx::query_as::<_, Department>(
            r"
            INSERT INTO departments (department_name, location, contact_person, contact_phone, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING department_id AS id, department_name AS name, location,
                      contact_person, contact_phone, is_active
            ",
        )
        .bind(&fields.name)
        .bind(&fields.location)
        .bind(&fields.contact_person)
        .bind(&fields.contact_phone)
        .bind(fields.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique(DUPLICATE_DEPARTMENT))
    }

    /// Update a department.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the department doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new name is taken.
    pub async fn update(
        &self,
        id: DepartmentId,
        fields: &DepartmentFields,
    ) -> Result<Department, RepositoryError> {
        sqlx::query_as::<_, Department>(
            r"
            UPDATE departments
            SET department_name = $2, location = $3, contact_person = $4,
                contact_phone = $5, is_active = $6
            WHERE department_id = $1
            RETURNING department_id AS id, department_name AS name, location,
                      contact_person, contact_phone, is_active
            ",
        )
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.location)
        .bind(&fields.contact_person)
        .bind(&fields.contact_phone)
        .bind(fields.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(conflict_on_unique(DUPLICATE_DEPARTMENT))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Count inventory batches, users and transactions referencing a department.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_references(&self, id: DepartmentId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT (SELECT COUNT(*) FROM inventory WHERE department_id = $1)
                 + (SELECT COUNT(*) FROM users WHERE department_id = $1)
                 + (SELECT COUNT(*) FROM transactions
                    WHERE department_id = $1 OR transfer_to_department = $1)
            ",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Delete a department.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the department doesn't exist.
    /// Returns `RepositoryError::Conflict` if anything still references it.
    pub async fn delete(&self, id: DepartmentId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM departments WHERE department_id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(conflict_on_reference(DEPARTMENT_IN_USE))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
