//! Supplier receipt history.
//!
//! Purchases are written by the ledger when stock is received; nothing
//! updates or deletes them.

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::PurchaseListing;

/// Repository for reading purchase records.
pub struct PurchaseRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PurchaseRepository<'a> {
    /// Create a new purchase repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Most recent purchases, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<PurchaseListing>, RepositoryError> {
        let purchases = sqlx::query_as::<_, PurchaseListing>(
            r"
            SELECT p.purchase_id AS id, d.drug_name, s.supplier_name, p.batch_number,
                   p.quantity, p.unit_price, p.total_price, p.purchase_date, p.expiry_date,
                   u.full_name AS received_by_name
            FROM purchases p
            JOIN drugs d ON d.drug_id = p.drug_id
            JOIN suppliers s ON s.supplier_id = p.supplier_id
            JOIN users u ON u.user_id = p.received_by
            ORDER BY p.purchase_date DESC, p.purchase_id DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(purchases)
    }
}
