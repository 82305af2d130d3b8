//! Database operations for the pharmacy `PostgreSQL` store.
//!
//! ## Tables
//!
//! - `drugs`, `drug_categories`, `departments`, `suppliers` - reference data
//! - `inventory` - stock batches keyed by (drug, department, batch, expiry)
//! - `purchases` - append-only supplier receipts
//! - `transactions`, `stock_movements` - the ledger and its per-batch legs
//! - `users`, `activity_log` - accounts and audit trail
//! - `tower_sessions.session` - session storage
//!
//! Repositories here read and perform single-statement writes. Multi-row
//! stock changes belong to the ledger, which runs them in one transaction.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p pharmacy-cli -- migrate
//! ```

pub mod activity_log;
pub mod categories;
pub mod departments;
pub mod drugs;
pub mod inventory;
pub mod purchases;
pub mod suppliers;
pub mod transactions;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use activity_log::ActivityLogRepository;
pub use categories::CategoryRepository;
pub use departments::DepartmentRepository;
pub use drugs::DrugRepository;
pub use inventory::InventoryRepository;
pub use purchases::PurchaseRepository;
pub use suppliers::SupplierRepository;
pub use transactions::TransactionRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate name).
    #[error("{0}")]
    Conflict(String),
}

/// Map a unique-constraint violation to [`RepositoryError::Conflict`].
///
/// Any other error is passed through as [`RepositoryError::Database`].
pub(crate) fn conflict_on_unique(message: &str) -> impl FnOnce(sqlx::Error) -> RepositoryError + '_ {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict(message.to_string());
        }
        RepositoryError::Database(e)
    }
}

/// Map a foreign-key violation to [`RepositoryError::Conflict`].
///
/// Deletes check references up front; this catches rows added in between.
pub(crate) fn conflict_on_reference(
    message: &str,
) -> impl FnOnce(sqlx::Error) -> RepositoryError + '_ {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_foreign_key_violation()
        {
            return RepositoryError::Conflict(message.to_string());
        }
        RepositoryError::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
