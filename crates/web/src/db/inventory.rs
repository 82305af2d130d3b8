//! Read-side inventory queries.
//!
//! Stock changes go through the ledger (`services::ledger`); this repository
//! only reports on what is on the shelves.

use chrono::NaiveDate;
use sqlx::PgPool;

use pharmacy_core::{DepartmentId, DrugId, InventoryId};

use super::RepositoryError;
use crate::models::{InventoryBatch, InventoryListing, LowStockItem};

const LISTING_QUERY: &str = r"
    SELECT i.inventory_id AS id, i.drug_id, d.drug_name, d.unit_of_measure, d.reorder_level,
           i.department_id, dep.department_name, i.quantity_in_stock AS quantity,
           i.batch_number, i.expiry_date, i.last_restocked,
           (i.expiry_date - $1::date) AS days_until_expiry
    FROM inventory i
    JOIN drugs d ON d.drug_id = i.drug_id
    JOIN departments dep ON dep.department_id = i.department_id
";

/// Repository for inventory reporting.
pub struct InventoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InventoryRepository<'a> {
    /// Create a new inventory repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List batches, optionally for one department, soonest expiry first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        today: NaiveDate,
        department: Option<DepartmentId>,
    ) -> Result<Vec<InventoryListing>, RepositoryError> {
        let batches = sqlx::query_as::<_, InventoryListing>(&format!(
            r"{LISTING_QUERY}
            WHERE ($2::int IS NULL OR i.department_id = $2)
            ORDER BY d.drug_name, dep.department_name, i.expiry_date NULLS LAST, i.inventory_id
            "
        ))
        .bind(today)
        .bind(department)
        .fetch_all(self.pool)
        .await?;

        Ok(batches)
    }

    /// Get a single batch.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: InventoryId) -> Result<Option<InventoryBatch>, RepositoryError> {
        let batch = sqlx::query_as::<_, InventoryBatch>(
            r"
            SELECT inventory_id AS id, drug_id, department_id, quantity_in_stock AS quantity,
                   batch_number, expiry_date, last_restocked
            FROM inventory
            WHERE inventory_id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(batch)
    }

    /// Total on-hand quantity of a drug at a department.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stock_total(
        &self,
        drug: DrugId,
        department: DepartmentId,
    ) -> Result<i64, RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            r"
            SELECT COALESCE(SUM(quantity_in_stock), 0)::BIGINT
            FROM inventory
            WHERE drug_id = $1 AND department_id = $2
            ",
        )
        .bind(drug)
        .bind(department)
        .fetch_one(self.pool)
        .await?;

        Ok(total)
    }

    /// Count batches that currently hold stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_stocked_batches(&self) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM inventory WHERE quantity_in_stock > 0")
                .fetch_one(self.pool)
                .await?;

        Ok(count)
    }

    /// Drug/department pairs whose total stock is at or below the reorder level.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn low_stock(&self, limit: i64) -> Result<Vec<LowStockItem>, RepositoryError> {
        let items = sqlx::query_as::<_, LowStockItem>(
            r"
            SELECT d.drug_id, d.drug_name, dep.department_name,
                   SUM(i.quantity_in_stock)::BIGINT AS total_stock, d.reorder_level
            FROM inventory i
            JOIN drugs d ON d.drug_id = i.drug_id
            JOIN departments dep ON dep.department_id = i.department_id
            WHERE d.is_active
            GROUP BY d.drug_id, dep.department_id
            HAVING SUM(i.quantity_in_stock) <= d.reorder_level
            ORDER BY SUM(i.quantity_in_stock) - d.reorder_level, d.drug_name
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Stocked batches expiring between today and `today + days`, soonest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn expiring_within(
        &self,
        today: NaiveDate,
        days: i32,
        limit: i64,
    ) -> Result<Vec<InventoryListing>, RepositoryError> {
        let batches = sqlx::query_as::<_, InventoryListing>(&format!(
            r"{LISTING_QUERY}
            WHERE i.quantity_in_stock > 0
              AND i.expiry_date BETWEEN $1::date AND $1::date + $2::int
            ORDER BY i.expiry_date, d.drug_name
            LIMIT $3
            "
        ))
        .bind(today)
        .bind(days)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(batches)
    }
}
