//! Domain models for the pharmacy.
//!
//! Types that map one-to-one onto query results derive `sqlx::FromRow`
//! directly; types that need validation on the way out of the database go
//! through private row structs in the `db` repositories.

pub mod catalog;
pub mod inventory;
pub mod session;
pub mod user;

pub use catalog::{
    Category, CategoryFields, CategoryListing, Department, DepartmentFields, Drug, DrugFields,
    DrugListing, Supplier, SupplierFields,
};
pub use inventory::{
    AppliedMovement, InventoryBatch, InventoryListing, LowStockItem, Purchase, PurchaseListing,
    StockMovement, StockTransaction, TransactionListing, WeeklySummary,
};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NewUser, User, UserListing, UserUpdate};
