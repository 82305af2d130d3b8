//! Integration tests for Pharmacy Inventory.
//!
//! Each test gets a fresh database from `#[sqlx::test]` with the web crate's
//! migrations applied.
//!
//! # Running Tests
//!
//! ```bash
//! export DATABASE_URL=postgres://localhost/pharmacy_test
//! cargo test -p pharmacy-integration-tests -- --ignored
//! ```
//!
//! # Test Files
//!
//! - `ledger` - restock, dispensing, transfers, adjustments and reversal
//! - `registry` - reference data rules and the activity log
//! - `accounts` - login, password reset and user administration

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;

use pharmacy_core::{DepartmentId, DrugId, InventoryId, Role, SupplierId, UserId};
use pharmacy_web::models::{DepartmentFields, DrugFields, SupplierFields};
use pharmacy_web::services::ledger::{Ledger, LedgerPolicy, Restock};
use pharmacy_web::services::registry::Registry;
use pharmacy_web::services::users::{AccountRequest, UserAdmin};

/// Password given to every fixture account.
pub const PASSWORD: &str = "correct-horse-battery";

/// Business date used by fixture ledgers.
#[must_use]
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
}

/// A date `days` after [`today`].
#[must_use]
pub fn days_ahead(days: i64) -> NaiveDate {
    today() + chrono::Duration::days(days)
}

/// Reference data shared by the tests.
#[derive(Debug, Clone, Copy)]
pub struct Fixture {
    pub admin: UserId,
    pub drug: DrugId,
    pub pharmacy: DepartmentId,
    pub ward: DepartmentId,
    pub supplier: SupplierId,
}

impl Fixture {
    /// Create an administrator, two departments, a supplier and a drug.
    pub async fn seed(pool: &PgPool) -> Self {
        let registry = Registry::new(pool);

        let pharmacy = registry
            .create_department(department("Main Pharmacy"))
            .await
            .unwrap();
        let ward = registry.create_department(department("Ward 3")).await.unwrap();
        let supplier = registry
            .create_supplier(SupplierFields {
                name: "MedSupply Ltd".to_string(),
                contact_person: None,
                contact_phone: None,
                email: Some("orders@medsupply.example".to_string()),
                address: None,
                is_active: true,
            })
            .await
            .unwrap();
        let drug = registry
            .create_drug(DrugFields {
                name: "Amoxicillin 500mg".to_string(),
                generic_name: Some("Amoxicillin".to_string()),
                category_id: None,
                unit_of_measure: "capsule".to_string(),
                reorder_level: 20,
                description: None,
            })
            .await
            .unwrap();
        let admin = create_user(pool, "admin", Role::Admin, Some(pharmacy.id)).await;

        Self {
            admin,
            drug: drug.id,
            pharmacy: pharmacy.id,
            ward: ward.id,
            supplier: supplier.id,
        }
    }

    /// A ledger fixed at [`today`] with the default policy.
    #[must_use]
    pub fn ledger<'a>(&self, pool: &'a PgPool) -> Ledger<'a> {
        Ledger::new(pool, LedgerPolicy::default()).on(today())
    }

    /// Receive `quantity` of the fixture drug into the main pharmacy.
    pub async fn restock(
        &self,
        pool: &PgPool,
        batch: &str,
        quantity: i32,
        expiry: NaiveDate,
        unit_price: Decimal,
    ) -> InventoryId {
        let receipt = self
            .ledger(pool)
            .restock(
                self.admin,
                &Restock {
                    drug_id: self.drug,
                    department_id: self.pharmacy,
                    supplier_id: self.supplier,
                    quantity,
                    batch_number: batch.to_string(),
                    expiry_date: expiry,
                    unit_price,
                    notes: None,
                },
            )
            .await
            .unwrap();
        receipt.movements[0].inventory_id
    }
}

/// Create an active account with [`PASSWORD`].
pub async fn create_user(
    pool: &PgPool,
    username: &str,
    role: Role,
    department_id: Option<DepartmentId>,
) -> UserId {
    UserAdmin::new(pool)
        .create(AccountRequest {
            username: username.to_string(),
            password: PASSWORD.to_string(),
            full_name: format!("{username} user"),
            email: Some(format!("{username}@hospital.example")),
            department_id,
            role,
        })
        .await
        .unwrap()
        .id
}

/// On-hand quantity of one batch.
pub async fn batch_quantity(pool: &PgPool, id: InventoryId) -> i32 {
    sqlx::query_scalar("SELECT quantity_in_stock FROM inventory WHERE inventory_id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

fn department(name: &str) -> DepartmentFields {
    DepartmentFields {
        name: name.to_string(),
        location: None,
        contact_person: None,
        contact_phone: None,
        is_active: true,
    }
}
