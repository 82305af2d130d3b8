//! Inventory batches, purchases and ledger transactions.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pharmacy_core::{
    DepartmentId, DrugId, InventoryId, PurchaseId, SupplierId, TransactionId, TransactionType,
    UserId,
};

/// Stock of one drug at one department sharing a batch number and expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct InventoryBatch {
    pub id: InventoryId,
    pub drug_id: DrugId,
    pub department_id: DepartmentId,
    /// Never negative.
    pub quantity: i32,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub last_restocked: Option<NaiveDate>,
}

impl InventoryBatch {
    /// Whether the batch has expired as of `today`.
    #[must_use]
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < today)
    }
}

/// A batch joined with its drug and department for the inventory screen.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InventoryListing {
    pub id: InventoryId,
    pub drug_id: DrugId,
    pub drug_name: String,
    pub unit_of_measure: String,
    pub reorder_level: i32,
    pub department_id: DepartmentId,
    pub department_name: String,
    pub quantity: i32,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub last_restocked: Option<NaiveDate>,
    /// Days from today to expiry; negative once expired.
    pub days_until_expiry: Option<i32>,
}

impl InventoryListing {
    /// Whether this batch is at or below the drug's reorder level.
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.days_until_expiry.is_some_and(|d| d < 0)
    }

    /// Whether the batch expires within `days` but has not expired yet.
    #[must_use]
    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn expires_within(&self, days: &i32) -> bool {
        self.days_until_expiry.is_some_and(|d| (0..=*days).contains(&d))
    }
}

/// Append-only record of stock received from a supplier.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Purchase {
    pub id: PurchaseId,
    pub drug_id: DrugId,
    pub supplier_id: SupplierId,
    pub batch_number: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub purchase_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub received_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// A purchase joined with drug, supplier and receiver names.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PurchaseListing {
    pub id: PurchaseId,
    pub drug_name: String,
    pub supplier_name: String,
    pub batch_number: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub purchase_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub received_by_name: String,
}

/// One ledger transaction.
///
/// `quantity` is a magnitude; the signed per-batch effect lives in
/// [`StockMovement`] rows.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StockTransaction {
    pub id: TransactionId,
    pub drug_id: DrugId,
    pub department_id: DepartmentId,
    pub transaction_type: TransactionType,
    pub quantity: i32,
    pub transfer_to_department: Option<DepartmentId>,
    pub unit_price: Option<Decimal>,
    /// Negative for returns.
    pub total_amount: Option<Decimal>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// Signed quantity change applied to one batch by one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StockMovement {
    pub transaction_id: TransactionId,
    pub inventory_id: InventoryId,
    pub quantity_delta: i32,
}

/// A movement as applied, with the batch quantity that resulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AppliedMovement {
    pub inventory_id: InventoryId,
    pub quantity_delta: i32,
    pub quantity_after: i32,
}

/// A transaction joined with display names for the transactions screen.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionListing {
    pub id: TransactionId,
    pub transaction_type: TransactionType,
    pub drug_name: String,
    pub department_name: String,
    pub transfer_to_name: Option<String>,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
    pub total_amount: Option<Decimal>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub created_by_name: String,
    pub created_at: DateTime<Utc>,
}

/// Total stock of a drug at a department that has fallen to its reorder level.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LowStockItem {
    pub drug_id: DrugId,
    pub drug_name: String,
    pub department_name: String,
    pub total_stock: i64,
    pub reorder_level: i32,
}

/// Sales and returns over a reporting window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct WeeklySummary {
    pub total_sales: Decimal,
    /// Sum of return totals; zero or negative.
    pub total_returns: Decimal,
}

impl WeeklySummary {
    /// Sales net of returns.
    #[must_use]
    pub fn net(&self) -> Decimal {
        self.total_sales + self.total_returns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(expiry: Option<NaiveDate>) -> InventoryBatch {
        InventoryBatch {
            id: InventoryId::new(1),
            drug_id: DrugId::new(1),
            department_id: DepartmentId::new(1),
            quantity: 10,
            batch_number: Some("B-1".to_string()),
            expiry_date: expiry,
            last_restocked: None,
        }
    }

    #[test]
    fn test_batch_expiry() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap_or_default();
        assert!(batch(today.pred_opt()).is_expired(today));
        assert!(!batch(Some(today)).is_expired(today));
        assert!(!batch(None).is_expired(today));
    }

    #[test]
    fn test_listing_flags() {
        let listing = InventoryListing {
            id: InventoryId::new(7),
            drug_id: DrugId::new(1),
            drug_name: "Amoxicillin".to_string(),
            unit_of_measure: "capsule".to_string(),
            reorder_level: 20,
            department_id: DepartmentId::new(2),
            department_name: "Outpatient".to_string(),
            quantity: 20,
            batch_number: None,
            expiry_date: None,
            last_restocked: None,
            days_until_expiry: Some(12),
        };
        assert!(listing.is_low_stock());
        assert!(listing.expires_within(&30));
        assert!(!listing.expires_within(&10));
        assert!(!listing.is_expired());

        let expired = InventoryListing {
            quantity: 21,
            days_until_expiry: Some(-1),
            ..listing
        };
        assert!(!expired.is_low_stock());
        assert!(expired.is_expired());
        assert!(!expired.expires_within(&30));
    }

    #[test]
    fn test_weekly_summary_net() {
        let summary = WeeklySummary {
            total_sales: Decimal::new(12_500, 0),
            total_returns: Decimal::new(-2_000, 0),
        };
        assert_eq!(summary.net(), Decimal::new(10_500, 0));
    }
}
