//! Drug category repository.

use sqlx::PgPool;

use pharmacy_core::CategoryId;

use super::{RepositoryError, conflict_on_reference, conflict_on_unique};
use crate::models::{Category, CategoryFields, CategoryListing};

const DUPLICATE_CATEGORY: &str = "Category already exists.";
/// Shown when a category still has drugs assigned.
pub const CATEGORY_IN_USE: &str = "Cannot delete category - it is assigned to drugs.";

/// Repository for drug category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all categories by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(
            r"
            SELECT category_id AS id, category_name AS name, description
            FROM drug_categories
            ORDER BY category_name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// List all categories with the number of drugs assigned to each.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_with_usage(&self) -> Result<Vec<CategoryListing>, RepositoryError> {
        let categories = sqlx::query_as::<_, CategoryListing>(
            r"
            SELECT c.category_id AS id, c.category_name AS name, c.description,
                   COUNT(d.drug_id) AS drug_count
            FROM drug_categories c
            LEFT JOIN drugs d ON d.category_id = c.category_id
            GROUP BY c.category_id
            ORDER BY c.category_name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(
            r"
            SELECT category_id AS id, category_name AS name, description
            FROM drug_categories
            WHERE category_id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(category)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create(&self, fields: &CategoryFields) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            r"
            INSERT INTO drug_categories (category_name, description)
            VALUES ($1, $2)
            RETURNING category_id AS id, category_name AS name, description
            ",
        )
        .bind(&fields.name)
        .bind(&fields.description)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique(DUPLICATE_CATEGORY))
    }

    /// Update a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new name is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        fields: &CategoryFields,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            r"
            UPDATE drug_categories
            SET category_name = $2, description = $3
            WHERE category_id = $1
            RETURNING category_id AS id, category_name AS name, description
            ",
        )
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.description)
        .fetch_optional(self.pool)
        .await
        .map_err(conflict_on_unique(DUPLICATE_CATEGORY))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Count drugs (active or not) assigned to a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_drugs(&self, id: CategoryId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM drugs WHERE category_id = $1")
            .bind(id)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Conflict` if a drug still references it.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM drug_categories WHERE category_id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(conflict_on_reference(CATEGORY_IN_USE))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
