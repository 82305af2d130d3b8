//! Statements the ledger runs inside its database transaction.
//!
//! Every function takes the open connection of the caller's transaction.
//! Reads that precede a write lock their rows with `FOR UPDATE`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgConnection;

use pharmacy_core::{
    DepartmentId, DrugId, InventoryId, SupplierId, TransactionId, TransactionType, UserId,
};

use crate::models::{InventoryBatch, Purchase, StockMovement, StockTransaction};
use crate::services::ServiceError;

const BATCH_COLUMNS: &str = r"
    inventory_id AS id, drug_id, department_id, quantity_in_stock AS quantity,
    batch_number, expiry_date, last_restocked
";

const TRANSACTION_COLUMNS: &str = r"
    transaction_id AS id, drug_id, department_id, transaction_type, quantity,
    transfer_to_department, unit_price, total_amount, reference_number, notes,
    created_by, created_at
";

/// Values for a new `transactions` row.
#[derive(Debug)]
pub(crate) struct NewTransaction<'a> {
    pub drug_id: DrugId,
    pub department_id: DepartmentId,
    pub transaction_type: TransactionType,
    pub quantity: i32,
    pub transfer_to: Option<DepartmentId>,
    pub unit_price: Option<Decimal>,
    pub total_amount: Option<Decimal>,
    pub reference_number: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub created_by: UserId,
}

/// Values for a new `purchases` row.
#[derive(Debug)]
pub(crate) struct NewPurchase<'a> {
    pub drug_id: DrugId,
    pub supplier_id: SupplierId,
    pub batch_number: &'a str,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub purchase_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub received_by: UserId,
}

// =============================================================================
// Reference checks
// =============================================================================

/// Whether an active drug with this ID exists.
pub(crate) async fn drug_is_active(conn: &mut PgConnection, id: DrugId) -> Result<bool, ServiceError> {
    let active: Option<bool> = sqlx::query_scalar("SELECT is_active FROM drugs WHERE drug_id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(active.unwrap_or(false))
}

/// Whether an active department with this ID exists.
pub(crate) async fn department_is_active(
    conn: &mut PgConnection,
    id: DepartmentId,
) -> Result<bool, ServiceError> {
    let active: Option<bool> =
        sqlx::query_scalar("SELECT is_active FROM departments WHERE department_id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
    Ok(active.unwrap_or(false))
}

/// Whether an active supplier with this ID exists.
pub(crate) async fn supplier_is_active(
    conn: &mut PgConnection,
    id: SupplierId,
) -> Result<bool, ServiceError> {
    let active: Option<bool> =
        sqlx::query_scalar("SELECT is_active FROM suppliers WHERE supplier_id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
    Ok(active.unwrap_or(false))
}

// =============================================================================
// Batches
// =============================================================================

/// Lock one batch.
pub(crate) async fn lock_batch(
    conn: &mut PgConnection,
    id: InventoryId,
) -> Result<Option<InventoryBatch>, ServiceError> {
    let batch = sqlx::query_as::<_, InventoryBatch>(&format!(
        "SELECT {BATCH_COLUMNS} FROM inventory WHERE inventory_id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(batch)
}

/// Lock every batch of a drug at a department, soonest expiry first.
pub(crate) async fn lock_batches(
    conn: &mut PgConnection,
    drug: DrugId,
    department: DepartmentId,
) -> Result<Vec<InventoryBatch>, ServiceError> {
    let batches = sqlx::query_as::<_, InventoryBatch>(&format!(
        r"
        SELECT {BATCH_COLUMNS} FROM inventory
        WHERE drug_id = $1 AND department_id = $2
        ORDER BY expiry_date NULLS LAST, inventory_id
        FOR UPDATE
        "
    ))
    .bind(drug)
    .bind(department)
    .fetch_all(conn)
    .await?;
    Ok(batches)
}

/// Lock the batch with this logical key, if it exists.
pub(crate) async fn lock_batch_by_key(
    conn: &mut PgConnection,
    drug: DrugId,
    department: DepartmentId,
    batch_number: Option<&str>,
    expiry_date: Option<NaiveDate>,
) -> Result<Option<InventoryBatch>, ServiceError> {
    let batch = sqlx::query_as::<_, InventoryBatch>(&format!(
        r"
        SELECT {BATCH_COLUMNS} FROM inventory
        WHERE drug_id = $1 AND department_id = $2
          AND batch_number IS NOT DISTINCT FROM $3
          AND expiry_date IS NOT DISTINCT FROM $4
        FOR UPDATE
        "
    ))
    .bind(drug)
    .bind(department)
    .bind(batch_number)
    .bind(expiry_date)
    .fetch_optional(conn)
    .await?;
    Ok(batch)
}

/// Insert a batch holding `quantity`.
///
/// A concurrent insert of the same key surfaces as a unique violation, which
/// converts to a retryable conflict.
pub(crate) async fn insert_batch(
    conn: &mut PgConnection,
    drug: DrugId,
    department: DepartmentId,
    batch_number: Option<&str>,
    expiry_date: Option<NaiveDate>,
    quantity: i32,
    restocked_on: Option<NaiveDate>,
) -> Result<InventoryBatch, ServiceError> {
    let batch = sqlx::query_as::<_, InventoryBatch>(&format!(
        r"
        INSERT INTO inventory (drug_id, department_id, batch_number, expiry_date,
                               quantity_in_stock, last_restocked)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {BATCH_COLUMNS}
        "
    ))
    .bind(drug)
    .bind(department)
    .bind(batch_number)
    .bind(expiry_date)
    .bind(quantity)
    .bind(restocked_on)
    .fetch_one(conn)
    .await?;
    Ok(batch)
}

/// Add `delta` to a batch unless the result would be negative.
///
/// Returns the new quantity. `on_negative` becomes the conflict message when
/// the guard refuses the write.
pub(crate) async fn apply_delta(
    conn: &mut PgConnection,
    id: InventoryId,
    delta: i32,
    on_negative: &str,
) -> Result<i32, ServiceError> {
    let quantity: Option<i32> = sqlx::query_scalar(
        r"
        UPDATE inventory
        SET quantity_in_stock = quantity_in_stock + $2
        WHERE inventory_id = $1 AND quantity_in_stock + $2 >= 0
        RETURNING quantity_in_stock
        ",
    )
    .bind(id)
    .bind(delta)
    .fetch_optional(conn)
    .await?;

    quantity.ok_or_else(|| ServiceError::conflict(on_negative))
}

/// Stamp a batch as restocked on `date`.
pub(crate) async fn mark_restocked(
    conn: &mut PgConnection,
    id: InventoryId,
    date: NaiveDate,
) -> Result<(), ServiceError> {
    sqlx::query("UPDATE inventory SET last_restocked = $2 WHERE inventory_id = $1")
        .bind(id)
        .bind(date)
        .execute(conn)
        .await?;
    Ok(())
}

/// Replace a batch's expiry date.
pub(crate) async fn set_expiry(
    conn: &mut PgConnection,
    id: InventoryId,
    expiry_date: NaiveDate,
) -> Result<(), ServiceError> {
    sqlx::query("UPDATE inventory SET expiry_date = $2 WHERE inventory_id = $1")
        .bind(id)
        .bind(expiry_date)
        .execute(conn)
        .await?;
    Ok(())
}

// =============================================================================
// Pricing
// =============================================================================

/// Unit price of the most recent purchase of a drug.
pub(crate) async fn latest_purchase_price(
    conn: &mut PgConnection,
    drug: DrugId,
) -> Result<Option<Decimal>, ServiceError> {
    let price: Option<Decimal> = sqlx::query_scalar(
        r"
        SELECT unit_price FROM purchases
        WHERE drug_id = $1
        ORDER BY purchase_date DESC, purchase_id DESC
        LIMIT 1
        ",
    )
    .bind(drug)
    .fetch_optional(conn)
    .await?;
    Ok(price)
}

/// Unit price of the most recent priced sale of a drug.
pub(crate) async fn latest_sale_price(
    conn: &mut PgConnection,
    drug: DrugId,
) -> Result<Option<Decimal>, ServiceError> {
    let price: Option<Decimal> = sqlx::query_scalar(
        r"
        SELECT unit_price FROM transactions
        WHERE drug_id = $1 AND transaction_type = 'sale' AND unit_price IS NOT NULL
        ORDER BY created_at DESC, transaction_id DESC
        LIMIT 1
        ",
    )
    .bind(drug)
    .fetch_optional(conn)
    .await?;
    Ok(price)
}

// =============================================================================
// Records
// =============================================================================

/// Append a purchase.
pub(crate) async fn insert_purchase(
    conn: &mut PgConnection,
    purchase: &NewPurchase<'_>,
    total_price: Decimal,
) -> Result<Purchase, ServiceError> {
    let row = sqlx::query_as::<_, Purchase>(
        r"
        INSERT INTO purchases (drug_id, supplier_id, batch_number, quantity, unit_price,
                               total_price, purchase_date, expiry_date, received_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING purchase_id AS id, drug_id, supplier_id, batch_number, quantity,
                  unit_price, total_price, purchase_date, expiry_date, received_by, created_at
        ",
    )
    .bind(purchase.drug_id)
    .bind(purchase.supplier_id)
    .bind(purchase.batch_number)
    .bind(purchase.quantity)
    .bind(purchase.unit_price)
    .bind(total_price)
    .bind(purchase.purchase_date)
    .bind(purchase.expiry_date)
    .bind(purchase.received_by)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Append a ledger transaction.
pub(crate) async fn insert_transaction(
    conn: &mut PgConnection,
    tx: &NewTransaction<'_>,
) -> Result<StockTransaction, ServiceError> {
    let row = sqlx::query_as::<_, StockTransaction>(&format!(
        r"
        INSERT INTO transactions (drug_id, department_id, transaction_type, quantity,
                                  transfer_to_department, unit_price, total_amount,
                                  reference_number, notes, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {TRANSACTION_COLUMNS}
        "
    ))
    .bind(tx.drug_id)
    .bind(tx.department_id)
    .bind(tx.transaction_type)
    .bind(tx.quantity)
    .bind(tx.transfer_to)
    .bind(tx.unit_price)
    .bind(tx.total_amount)
    .bind(tx.reference_number)
    .bind(tx.notes)
    .bind(tx.created_by)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Record one leg of a transaction.
pub(crate) async fn insert_movement(
    conn: &mut PgConnection,
    transaction: TransactionId,
    inventory: InventoryId,
    delta: i32,
) -> Result<(), ServiceError> {
    sqlx::query(
        "INSERT INTO stock_movements (transaction_id, inventory_id, quantity_delta) VALUES ($1, $2, $3)",
    )
    .bind(transaction)
    .bind(inventory)
    .bind(delta)
    .execute(conn)
    .await?;
    Ok(())
}

/// Lock a transaction for reversal.
pub(crate) async fn lock_transaction(
    conn: &mut PgConnection,
    id: TransactionId,
) -> Result<Option<StockTransaction>, ServiceError> {
    let row = sqlx::query_as::<_, StockTransaction>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE transaction_id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// Legs of a transaction in the order they were applied.
pub(crate) async fn movements(
    conn: &mut PgConnection,
    id: TransactionId,
) -> Result<Vec<StockMovement>, ServiceError> {
    let rows = sqlx::query_as::<_, StockMovement>(
        r"
        SELECT transaction_id, inventory_id, quantity_delta
        FROM stock_movements
        WHERE transaction_id = $1
        ORDER BY movement_id
        ",
    )
    .bind(id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Delete a transaction; its movements cascade.
pub(crate) async fn delete_transaction(
    conn: &mut PgConnection,
    id: TransactionId,
) -> Result<(), ServiceError> {
    sqlx::query("DELETE FROM transactions WHERE transaction_id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}
