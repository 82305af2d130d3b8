//! Reference data: drugs, categories, departments and suppliers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pharmacy_core::{CategoryId, DepartmentId, DrugId, SupplierId};

/// A drug category.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
}

/// A category with the number of drugs assigned to it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryListing {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub drug_count: i64,
}

/// A hospital department holding stock.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub location: Option<String>,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    pub is_active: bool,
}

/// A drug supplier.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
}

/// A drug in the formulary.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Drug {
    pub id: DrugId,
    pub name: String,
    pub generic_name: Option<String>,
    pub category_id: Option<CategoryId>,
    pub unit_of_measure: String,
    /// Total stock at or below this level flags the drug as low.
    pub reorder_level: i32,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A drug row for the drugs screen, with its category name and total stock.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DrugListing {
    pub id: DrugId,
    pub name: String,
    pub generic_name: Option<String>,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub unit_of_measure: String,
    pub reorder_level: i32,
    pub description: Option<String>,
    pub is_active: bool,
    pub total_stock: i64,
}

impl DrugListing {
    /// Whether total stock across all departments is at or below the reorder level.
    #[must_use]
    pub fn is_low_stock(&self) -> bool {
        self.total_stock <= i64::from(self.reorder_level)
    }
}

/// Validated values for creating or updating a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFields {
    pub name: String,
    pub description: Option<String>,
}

/// Validated values for creating or updating a department.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentFields {
    pub name: String,
    pub location: Option<String>,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    pub is_active: bool,
}

/// Validated values for creating or updating a supplier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierFields {
    pub name: String,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
}

/// Validated values for creating or updating a drug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrugFields {
    pub name: String,
    pub generic_name: Option<String>,
    pub category_id: Option<CategoryId>,
    pub unit_of_measure: String,
    pub reorder_level: i32,
    pub description: Option<String>,
}
