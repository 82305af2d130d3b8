//! Read-side ledger transaction queries.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use pharmacy_core::TransactionId;

use super::RepositoryError;
use crate::models::{StockMovement, StockTransaction, TransactionListing, WeeklySummary};

/// Repository for reporting on ledger transactions.
pub struct TransactionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TransactionRepository<'a> {
    /// Create a new transaction repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Most recent transactions with display names, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<TransactionListing>, RepositoryError> {
        let transactions = sqlx::query_as::<_, TransactionListing>(
            r"
            SELECT t.transaction_id AS id, t.transaction_type, d.drug_name,
                   dep.department_name, dest.department_name AS transfer_to_name,
                   t.quantity, t.unit_price, t.total_amount, t.reference_number, t.notes,
                   u.full_name AS created_by_name, t.created_at
            FROM transactions t
            JOIN drugs d ON d.drug_id = t.drug_id
            JOIN departments dep ON dep.department_id = t.department_id
            LEFT JOIN departments dest ON dest.department_id = t.transfer_to_department
            JOIN users u ON u.user_id = t.created_by
            ORDER BY t.created_at DESC, t.transaction_id DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(transactions)
    }

    /// Get a transaction by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: TransactionId) -> Result<Option<StockTransaction>, RepositoryError> {
        let transaction = sqlx::query_as::<_, StockTransaction>(
            r"
            SELECT transaction_id AS id, drug_id, department_id, transaction_type, quantity,
                   transfer_to_department, unit_price, total_amount, reference_number,
                   notes, created_by, created_at
            FROM transactions
            WHERE transaction_id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(transaction)
    }

    /// Per-batch legs recorded for a transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn movements(&self, id: TransactionId) -> Result<Vec<StockMovement>, RepositoryError> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r"
            SELECT transaction_id, inventory_id, quantity_delta
            FROM stock_movements
            WHERE transaction_id = $1
            ORDER BY movement_id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(movements)
    }

    /// Sales and returns totals since `since`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<WeeklySummary, RepositoryError> {
        let summary = sqlx::query_as::<_, WeeklySummary>(
            r"
            SELECT
                COALESCE(SUM(total_amount) FILTER (WHERE transaction_type = 'sale'), 0) AS total_sales,
                COALESCE(SUM(total_amount) FILTER (WHERE transaction_type = 'return'), 0) AS total_returns
            FROM transactions
            WHERE created_at >= $1
            ",
        )
        .bind(since)
        .fetch_one(self.pool)
        .await?;

        Ok(summary)
    }
}
