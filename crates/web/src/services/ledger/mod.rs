//! Inventory ledger.
//!
//! The ledger is the only code that changes `inventory.quantity_in_stock`.
//! Each operation runs in one database transaction and writes exactly one
//! `transactions` row plus one `stock_movements` row per batch it touched,
//! so every quantity change can be audited and reversed.
//!
//! Validation happens before the first write. A failure at any point drops
//! the uncommitted transaction, which rolls back everything it did.

pub mod rules;
mod store;

pub use rules::LedgerPolicy;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use pharmacy_core::{
    DepartmentId, DrugId, InventoryId, SupplierId, TransactionId, TransactionType, UserId,
};

use crate::models::{AppliedMovement, Purchase, StockTransaction};
use crate::services::ServiceError;
use store::{NewPurchase, NewTransaction};

const BATCH_NOT_FOUND: &str = "Inventory batch not found.";
const OUT_OF_STOCK: &str = "This drug is out of stock in the selected department.";
const NO_VALID_PRICE: &str = "Valid unit price not found for this drug.";
const STOCK_CHANGED: &str = "Stock changed while saving. Please retry.";
const EXPIRY_TAKEN: &str =
    "Another batch with this number already has that expiry date. Adjust that batch instead.";
const ALREADY_CONSUMED: &str =
    "Cannot reverse this transaction: the affected stock has already been used.";

// =============================================================================
// Requests
// =============================================================================

/// Receive stock from a supplier.
#[derive(Debug, Clone)]
pub struct Restock {
    pub drug_id: DrugId,
    pub department_id: DepartmentId,
    pub supplier_id: SupplierId,
    pub quantity: i32,
    pub batch_number: String,
    pub expiry_date: NaiveDate,
    pub unit_price: Decimal,
    pub notes: Option<String>,
}

/// Correct the quantity of one batch.
#[derive(Debug, Clone)]
pub struct Adjustment {
    pub inventory_id: InventoryId,
    /// Signed change; never zero.
    pub delta: i32,
    pub notes: Option<String>,
    /// Replaces the batch expiry when set.
    pub new_expiry: Option<NaiveDate>,
}

/// Move stock of one batch to another department.
#[derive(Debug, Clone)]
pub struct Transfer {
    pub inventory_id: InventoryId,
    pub quantity: i32,
    pub to_department: DepartmentId,
    pub notes: Option<String>,
}

/// Sale, return or issue of a drug at a department.
#[derive(Debug, Clone)]
pub struct Dispense {
    pub drug_id: DrugId,
    pub department_id: DepartmentId,
    pub quantity: i32,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
}

// =============================================================================
// Results
// =============================================================================

/// What a successful operation wrote.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerReceipt {
    pub transaction: StockTransaction,
    pub movements: Vec<AppliedMovement>,
    /// Set for restocks only.
    pub purchase: Option<Purchase>,
}

/// What a reversal undid.
#[derive(Debug, Clone, Serialize)]
pub struct Reversal {
    /// The deleted transaction.
    pub transaction: StockTransaction,
    /// Inverse legs with the quantities they restored.
    pub movements: Vec<AppliedMovement>,
}

// =============================================================================
// Ledger
// =============================================================================

/// Entry point for every stock-changing operation.
pub struct Ledger<'a> {
    pool: &'a PgPool,
    policy: LedgerPolicy,
    today: NaiveDate,
}

impl<'a> Ledger<'a> {
    /// Create a ledger whose business date is the current UTC date.
    #[must_use]
    pub fn new(pool: &'a PgPool, policy: LedgerPolicy) -> Self {
        Self {
            pool,
            policy,
            today: Utc::now().date_naive(),
        }
    }

    /// Use a fixed business date.
    #[must_use]
    pub const fn on(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Business date used for expiry rules and restock stamps.
    #[must_use]
    pub const fn today(&self) -> NaiveDate {
        self.today
    }

    /// Receive stock into the batch keyed by (drug, department, batch, expiry).
    ///
    /// # Errors
    ///
    /// Returns `Validation` for bad input or an inactive drug, department or
    /// supplier, and `Conflict` when a concurrent restock created the batch first.
    #[instrument(skip_all, fields(actor = %actor, drug_id = %request.drug_id, quantity = request.quantity))]
    pub async fn restock(&self, actor: UserId, request: &Restock) -> Result<LedgerReceipt, ServiceError> {
        let batch_number = request.batch_number.trim();
        rules::check_restock(
            request.quantity,
            request.unit_price,
            batch_number,
            request.expiry_date,
            self.today,
            &self.policy,
        )?;

        let mut tx = self.pool.begin().await?;

        if !store::drug_is_active(&mut *tx, request.drug_id).await?
            || !store::department_is_active(&mut *tx, request.department_id).await?
            || !store::supplier_is_active(&mut *tx, request.supplier_id).await?
        {
            return Err(ServiceError::validation(
                "Invalid selection. Choose an active drug, department and supplier.",
            ));
        }

        let existing = store::lock_batch_by_key(
            &mut *tx,
            request.drug_id,
            request.department_id,
            Some(batch_number),
            Some(request.expiry_date),
        )
        .await?;

        let (inventory_id, quantity_after) = match existing {
            Some(batch) => {
                let after = store::apply_delta(&mut *tx, batch.id, request.quantity, STOCK_CHANGED).await?;
                store::mark_restocked(&mut *tx, batch.id, self.today).await?;
                (batch.id, after)
            }
            None => {
                let batch = store::insert_batch(
                    &mut *tx,
                    request.drug_id,
                    request.department_id,
                    Some(batch_number),
                    Some(request.expiry_date),
                    request.quantity,
                    Some(self.today),
                )
                .await?;
                (batch.id, batch.quantity)
            }
        };

        let total = rules::extended_total(request.quantity, request.unit_price)?;
        let purchase = store::insert_purchase(
            &mut *tx,
            &NewPurchase {
                drug_id: request.drug_id,
                supplier_id: request.supplier_id,
                batch_number,
                quantity: request.quantity,
                unit_price: request.unit_price,
                purchase_date: self.today,
                expiry_date: request.expiry_date,
                received_by: actor,
            },
            total,
        )
        .await?;

        let transaction = store::insert_transaction(
            &mut *tx,
            &NewTransaction {
                drug_id: request.drug_id,
                department_id: request.department_id,
                transaction_type: TransactionType::StockReceive,
                quantity: request.quantity,
                transfer_to: None,
                unit_price: Some(request.unit_price),
                total_amount: Some(total),
                reference_number: Some(batch_number),
                notes: request.notes.as_deref(),
                created_by: actor,
            },
        )
        .await?;

        let movements = vec![
            record_leg(&mut *tx, transaction.id, inventory_id, request.quantity, quantity_after).await?,
        ];

        tx.commit().await?;
        tracing::info!(transaction_id = %transaction.id, "Stock received");

        Ok(LedgerReceipt {
            transaction,
            movements,
            purchase: Some(purchase),
        })
    }

    /// Change one batch by a signed delta.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a zero delta, `NotFound` for a missing batch
    /// and `Conflict` when the batch would go negative or the new expiry
    /// matches another batch with the same number.
    #[instrument(skip_all, fields(actor = %actor, inventory_id = %request.inventory_id, delta = request.delta))]
    pub async fn adjust(&self, actor: UserId, request: &Adjustment) -> Result<LedgerReceipt, ServiceError> {
        let magnitude = request
            .delta
            .checked_abs()
            .ok_or_else(|| ServiceError::validation("Adjustment quantity is too large."))?;
        if magnitude == 0 {
            return Err(ServiceError::validation("Adjustment quantity cannot be zero."));
        }

        let mut tx = self.pool.begin().await?;

        let batch = store::lock_batch(&mut *tx, request.inventory_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(BATCH_NOT_FOUND))?;
        rules::adjusted_quantity(batch.quantity, request.delta)?;

        let after = store::apply_delta(
            &mut *tx,
            batch.id,
            request.delta,
            "Adjustment would result in negative stock.",
        )
        .await?;
        if let Some(expiry) = request.new_expiry.filter(|e| batch.expiry_date != Some(*e)) {
            let twin = store::lock_batch_by_key(
                &mut *tx,
                batch.drug_id,
                batch.department_id,
                batch.batch_number.as_deref(),
                Some(expiry),
            )
            .await?;
            if twin.is_some() {
                return Err(ServiceError::conflict(EXPIRY_TAKEN));
            }
            store::set_expiry(&mut *tx, batch.id, expiry).await?;
        }

        let transaction = store::insert_transaction(
            &mut *tx,
            &NewTransaction {
                drug_id: batch.drug_id,
                department_id: batch.department_id,
                transaction_type: rules::adjustment_type(request.delta),
                quantity: magnitude,
                transfer_to: None,
                unit_price: None,
                total_amount: None,
                reference_number: None,
                notes: request.notes.as_deref(),
                created_by: actor,
            },
        )
        .await?;

        let movements = vec![record_leg(&mut *tx, transaction.id, batch.id, request.delta, after).await?];

        tx.commit().await?;
        tracing::info!(transaction_id = %transaction.id, quantity_after = after, "Stock adjusted");

        Ok(LedgerReceipt {
            transaction,
            movements,
            purchase: None,
        })
    }

    /// Move stock from one batch to the same batch at another department.
    ///
    /// The destination keeps the source's batch number and expiry and is
    /// created when missing.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing batch, `Validation` for a bad quantity
    /// or inactive destination, and `Conflict` for a same-department transfer
    /// or insufficient stock.
    #[instrument(skip_all, fields(actor = %actor, inventory_id = %request.inventory_id, to = %request.to_department))]
    pub async fn transfer(&self, actor: UserId, request: &Transfer) -> Result<LedgerReceipt, ServiceError> {
        rules::require_positive(request.quantity, "Transfer quantity must be positive.")?;

        let mut tx = self.pool.begin().await?;

        let source = store::lock_batch(&mut *tx, request.inventory_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(BATCH_NOT_FOUND))?;
        if request.to_department != source.department_id
            && !store::department_is_active(&mut *tx, request.to_department).await?
        {
            return Err(ServiceError::validation("Invalid destination department."));
        }
        rules::check_transfer(&source, request.quantity, request.to_department)?;

        let source_after = store::apply_delta(
            &mut *tx,
            source.id,
            -request.quantity,
            "Not enough stock for transfer.",
        )
        .await?;

        let destination = store::lock_batch_by_key(
            &mut *tx,
            source.drug_id,
            request.to_department,
            source.batch_number.as_deref(),
            source.expiry_date,
        )
        .await?;
        let (destination_id, destination_after) = match destination {
            Some(batch) => {
                let after = store::apply_delta(&mut *tx, batch.id, request.quantity, STOCK_CHANGED).await?;
                (batch.id, after)
            }
            None => {
                let batch = store::insert_batch(
                    &mut *tx,
                    source.drug_id,
                    request.to_department,
                    source.batch_number.as_deref(),
                    source.expiry_date,
                    request.quantity,
                    None,
                )
                .await?;
                (batch.id, batch.quantity)
            }
        };

        let transaction = store::insert_transaction(
            &mut *tx,
            &NewTransaction {
                drug_id: source.drug_id,
                department_id: source.department_id,
                transaction_type: TransactionType::Transfer,
                quantity: request.quantity,
                transfer_to: Some(request.to_department),
                unit_price: None,
                total_amount: None,
                reference_number: None,
                notes: request.notes.as_deref(),
                created_by: actor,
            },
        )
        .await?;

        let movements = vec![
            record_leg(&mut *tx, transaction.id, source.id, -request.quantity, source_after).await?,
            record_leg(&mut *tx, transaction.id, destination_id, request.quantity, destination_after)
                .await?,
        ];

        tx.commit().await?;
        tracing::info!(transaction_id = %transaction.id, "Stock transferred");

        Ok(LedgerReceipt {
            transaction,
            movements,
            purchase: None,
        })
    }

    /// Sell a drug, debiting batches first expiry first out.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the department holds no batch of the drug, and
    /// `Conflict` for insufficient stock, any batch near expiry, or a
    /// missing purchase price.
    #[instrument(skip_all, fields(actor = %actor, drug_id = %request.drug_id, quantity = request.quantity))]
    pub async fn record_sale(&self, actor: UserId, request: &Dispense) -> Result<LedgerReceipt, ServiceError> {
        rules::require_positive(request.quantity, "Quantity must be at least 1.")?;

        let mut tx = self.pool.begin().await?;

        let batches = store::lock_batches(&mut *tx, request.drug_id, request.department_id).await?;
        if batches.is_empty() {
            return Err(ServiceError::not_found(OUT_OF_STOCK));
        }
        let available = rules::on_hand(&batches);
        if available < i64::from(request.quantity) {
            return Err(ServiceError::conflict(format!(
                "Not enough stock available. Only {available} units in stock."
            )));
        }
        if let Some(batch) =
            rules::near_expiry_batch(&batches, self.policy.sale_block_horizon(self.today))
        {
            tracing::debug!(inventory_id = %batch.id, "Sale blocked by near-expiry batch");
            return Err(ServiceError::conflict(format!(
                "Cannot sell drugs expiring within {} days. Remove or adjust the expiring batch first.",
                self.policy.sale_expiry_block_days
            )));
        }
        let unit_price = store::latest_purchase_price(&mut *tx, request.drug_id)
            .await?
            .filter(|price| *price > Decimal::ZERO)
            .ok_or_else(|| ServiceError::conflict(NO_VALID_PRICE))?;

        let legs = rules::plan_fefo_debit(&batches, request.quantity)?;
        let total = rules::extended_total(request.quantity, unit_price)?;

        let receipt = write_dispense(
            &mut *tx,
            actor,
            request,
            TransactionType::Sale,
            Some(unit_price),
            Some(total),
            &legs,
        )
        .await?;

        tx.commit().await?;
        tracing::info!(transaction_id = %receipt.transaction.id, "Sale recorded");
        Ok(receipt)
    }

    /// Take back a sold drug into its latest-expiring batch.
    ///
    /// Priced at the most recent sale, falling back to the most recent
    /// purchase; unpriced when neither exists.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the department holds no batch of the drug.
    #[instrument(skip_all, fields(actor = %actor, drug_id = %request.drug_id, quantity = request.quantity))]
    pub async fn record_return(&self, actor: UserId, request: &Dispense) -> Result<LedgerReceipt, ServiceError> {
        rules::require_positive(request.quantity, "Quantity must be at least 1.")?;

        let mut tx = self.pool.begin().await?;

        let batches = store::lock_batches(&mut *tx, request.drug_id, request.department_id).await?;
        let target = rules::return_target(&batches).ok_or_else(|| {
            ServiceError::not_found("No inventory batch exists for this drug in the selected department.")
        })?;

        let unit_price = match store::latest_sale_price(&mut *tx, request.drug_id).await? {
            Some(price) => Some(price),
            None => store::latest_purchase_price(&mut *tx, request.drug_id).await?,
        };
        let total = unit_price
            .map(|price| rules::extended_total(request.quantity, price).map(|t| -t))
            .transpose()?;

        let legs = [(target.id, request.quantity)];
        let receipt = write_dispense(
            &mut *tx,
            actor,
            request,
            TransactionType::Return,
            unit_price,
            total,
            &legs,
        )
        .await?;

        tx.commit().await?;
        tracing::info!(transaction_id = %receipt.transaction.id, "Return recorded");
        Ok(receipt)
    }

    /// Issue a drug for internal use from non-expired batches.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the department holds no batch of the drug and
    /// `Conflict` when non-expired stock is insufficient.
    #[instrument(skip_all, fields(actor = %actor, drug_id = %request.drug_id, quantity = request.quantity))]
    pub async fn record_issue(&self, actor: UserId, request: &Dispense) -> Result<LedgerReceipt, ServiceError> {
        rules::require_positive(request.quantity, "Quantity must be at least 1.")?;

        let mut tx = self.pool.begin().await?;

        let batches = store::lock_batches(&mut *tx, request.drug_id, request.department_id).await?;
        if batches.is_empty() {
            return Err(ServiceError::not_found(OUT_OF_STOCK));
        }
        let usable: Vec<_> = batches
            .into_iter()
            .filter(|b| !b.is_expired(self.today))
            .collect();
        let legs = rules::plan_fefo_debit(&usable, request.quantity)?;

        let receipt = write_dispense(
            &mut *tx,
            actor,
            request,
            TransactionType::Issue,
            None,
            None,
            &legs,
        )
        .await?;

        tx.commit().await?;
        tracing::info!(transaction_id = %receipt.transaction.id, "Issue recorded");
        Ok(receipt)
    }

    /// Undo a transaction by replaying its movements inverted, then delete it.
    ///
    /// Purchases recorded by a restock are kept.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing transaction and `Conflict` when the
    /// stock it added has since been consumed.
    #[instrument(skip_all, fields(actor = %actor, transaction_id = %id))]
    pub async fn reverse(&self, actor: UserId, id: TransactionId) -> Result<Reversal, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let transaction = store::lock_transaction(&mut *tx, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Transaction not found."))?;
        let recorded = store::movements(&mut *tx, id).await?;
        if recorded.is_empty() {
            return Err(ServiceError::conflict(
                "This transaction has no recorded stock movements and cannot be reversed.",
            ));
        }

        let mut movements = Vec::with_capacity(recorded.len());
        for (inventory_id, delta) in rules::inverse_legs(&recorded) {
            let after = store::apply_delta(&mut *tx, inventory_id, delta, ALREADY_CONSUMED).await?;
            movements.push(AppliedMovement {
                inventory_id,
                quantity_delta: delta,
                quantity_after: after,
            });
        }

        store::delete_transaction(&mut *tx, id).await?;
        tx.commit().await?;
        tracing::info!(transaction_type = %transaction.transaction_type, "Transaction reversed");

        Ok(Reversal {
            transaction,
            movements,
        })
    }
}

/// Apply dispensing legs and write the transaction that owns them.
#[allow(clippy::too_many_arguments)]
async fn write_dispense(
    conn: &mut PgConnection,
    actor: UserId,
    request: &Dispense,
    transaction_type: TransactionType,
    unit_price: Option<Decimal>,
    total_amount: Option<Decimal>,
    legs: &[(InventoryId, i32)],
) -> Result<LedgerReceipt, ServiceError> {
    let mut applied = Vec::with_capacity(legs.len());
    for &(inventory_id, delta) in legs {
        let after = store::apply_delta(&mut *conn, inventory_id, delta, STOCK_CHANGED).await?;
        applied.push((inventory_id, delta, after));
    }

    let transaction = store::insert_transaction(
        &mut *conn,
        &NewTransaction {
            drug_id: request.drug_id,
            department_id: request.department_id,
            transaction_type,
            quantity: request.quantity,
            transfer_to: None,
            unit_price,
            total_amount,
            reference_number: request.reference_number.as_deref(),
            notes: request.notes.as_deref(),
            created_by: actor,
        },
    )
    .await?;

    let mut movements = Vec::with_capacity(applied.len());
    for (inventory_id, delta, after) in applied {
        movements.push(record_leg(&mut *conn, transaction.id, inventory_id, delta, after).await?);
    }

    Ok(LedgerReceipt {
        transaction,
        movements,
        purchase: None,
    })
}

/// Insert a movement row and describe it.
async fn record_leg(
    conn: &mut PgConnection,
    transaction: TransactionId,
    inventory_id: InventoryId,
    delta: i32,
    quantity_after: i32,
) -> Result<AppliedMovement, ServiceError> {
    store::insert_movement(conn, transaction, inventory_id, delta).await?;
    Ok(AppliedMovement {
        inventory_id,
        quantity_delta: delta,
        quantity_after,
    })
}
