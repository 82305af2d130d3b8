//! Ledger integration tests.
//!
//! Run with: `cargo test -p pharmacy-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use sqlx::PgPool;

use pharmacy_core::TransactionType;
use pharmacy_integration_tests::{Fixture, batch_quantity, days_ahead};
use pharmacy_web::db::{InventoryRepository, PurchaseRepository, TransactionRepository};
use pharmacy_web::services::ServiceError;
use pharmacy_web::services::ledger::{Adjustment, Dispense, Transfer};

fn price(units: i64) -> Decimal {
    Decimal::new(units, 0)
}

fn dispense(fx: &Fixture, quantity: i32) -> Dispense {
    Dispense {
        drug_id: fx.drug,
        department_id: fx.pharmacy,
        quantity,
        reference_number: Some("RX-1".to_string()),
        notes: None,
    }
}

fn adjustment(
    inventory_id: pharmacy_core::InventoryId,
    delta: i32,
    new_expiry: Option<chrono::NaiveDate>,
) -> Adjustment {
    Adjustment {
        inventory_id,
        delta,
        notes: None,
        new_expiry,
    }
}

fn transfer(inventory_id: pharmacy_core::InventoryId, quantity: i32, fx: &Fixture) -> Transfer {
    Transfer {
        inventory_id,
        quantity,
        to_department: fx.ward,
        notes: None,
    }
}

async fn row_count(pool: &PgPool, sql: &'static str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}

// ============================================================================
// Restock
// ============================================================================

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_restock_merges_matching_batch(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let expiry = days_ahead(365);

    let first = fx.restock(&pool, "B-100", 50, expiry, price(2)).await;
    let second = fx.restock(&pool, "B-100", 30, expiry, price(2)).await;
    assert_eq!(first, second);
    assert_eq!(batch_quantity(&pool, first).await, 80);

    let other = fx.restock(&pool, "B-200", 10, expiry, price(2)).await;
    assert_ne!(first, other);

    let purchases = PurchaseRepository::new(&pool).recent(10).await.unwrap();
    assert_eq!(purchases.len(), 3);
    assert_eq!(
        InventoryRepository::new(&pool)
            .stock_total(fx.drug, fx.pharmacy)
            .await
            .unwrap(),
        90
    );
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_restock_rejects_short_shelf_life(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let result = fx
        .ledger(&pool)
        .restock(
            fx.admin,
            &pharmacy_web::services::ledger::Restock {
                drug_id: fx.drug,
                department_id: fx.pharmacy,
                supplier_id: fx.supplier,
                quantity: 10,
                batch_number: "B-1".to_string(),
                expiry_date: days_ahead(30),
                unit_price: price(1),
                notes: None,
            },
        )
        .await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));
    assert!(TransactionRepository::new(&pool).recent(10).await.unwrap().is_empty());
}

// ============================================================================
// Sales, issues and returns
// ============================================================================

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_sale_debits_earliest_expiry_first(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let early = fx.restock(&pool, "EARLY", 10, days_ahead(200), price(5)).await;
    let late = fx.restock(&pool, "LATE", 10, days_ahead(400), price(5)).await;

    let receipt = fx
        .ledger(&pool)
        .record_sale(fx.admin, &dispense(&fx, 15))
        .await
        .unwrap();

    assert_eq!(receipt.transaction.transaction_type, TransactionType::Sale);
    assert_eq!(receipt.transaction.total_amount, Some(price(75)));
    assert_eq!(receipt.movements.len(), 2);
    assert_eq!(batch_quantity(&pool, early).await, 0);
    assert_eq!(batch_quantity(&pool, late).await, 5);
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_sale_refuses_insufficient_stock(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let batch = fx.restock(&pool, "B-1", 5, days_ahead(365), price(5)).await;

    let result = fx.ledger(&pool).record_sale(fx.admin, &dispense(&fx, 6)).await;
    assert!(matches!(result, Err(ServiceError::Conflict(ref m)) if m.contains("Only 5 units")));
    assert_eq!(batch_quantity(&pool, batch).await, 5);
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_sale_blocked_by_near_expiry_batch(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let ledger = fx.ledger(&pool);
    let batch = fx.restock(&pool, "B-1", 20, days_ahead(365), price(5)).await;
    fx.restock(&pool, "B-2", 20, days_ahead(500), price(5)).await;

    // Correct the first batch's expiry to five days out.
    ledger
        .adjust(
            fx.admin,
            &Adjustment {
                inventory_id: batch,
                delta: -1,
                notes: Some("label correction".to_string()),
                new_expiry: Some(days_ahead(5)),
            },
        )
        .await
        .unwrap();

    let sale = ledger.record_sale(fx.admin, &dispense(&fx, 1)).await;
    assert!(matches!(sale, Err(ServiceError::Conflict(ref m)) if m.contains("10 days")));

    // Issues are still allowed from non-expired stock.
    let issue = ledger.record_issue(fx.admin, &dispense(&fx, 3)).await.unwrap();
    assert_eq!(issue.transaction.transaction_type, TransactionType::Issue);
    assert_eq!(issue.transaction.total_amount, None);
    assert_eq!(batch_quantity(&pool, batch).await, 16);
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_return_credits_latest_batch_at_sale_price(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let ledger = fx.ledger(&pool);
    fx.restock(&pool, "EARLY", 10, days_ahead(200), price(4)).await;
    let late = fx.restock(&pool, "LATE", 10, days_ahead(400), price(4)).await;
    ledger.record_sale(fx.admin, &dispense(&fx, 2)).await.unwrap();

    let receipt = ledger.record_return(fx.admin, &dispense(&fx, 2)).await.unwrap();
    assert_eq!(receipt.transaction.unit_price, Some(price(4)));
    assert_eq!(receipt.transaction.total_amount, Some(price(-8)));
    assert_eq!(receipt.movements[0].inventory_id, late);
    assert_eq!(batch_quantity(&pool, late).await, 12);

    let summary = TransactionRepository::new(&pool)
        .summary_since(chrono::Utc::now() - chrono::Duration::days(7))
        .await
        .unwrap();
    assert_eq!(summary.total_sales, price(8));
    assert_eq!(summary.net(), Decimal::ZERO);
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_return_without_batch_is_not_found(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let result = fx.ledger(&pool).record_return(fx.admin, &dispense(&fx, 1)).await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

// ============================================================================
// Transfers and adjustments
// ============================================================================

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_transfer_keeps_batch_identity(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let expiry = days_ahead(365);
    let source = fx.restock(&pool, "B-7", 40, expiry, price(3)).await;

    let receipt = fx
        .ledger(&pool)
        .transfer(
            fx.admin,
            &Transfer {
                inventory_id: source,
                quantity: 15,
                to_department: fx.ward,
                notes: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(receipt.transaction.transfer_to_department, Some(fx.ward));
    let destination = receipt.movements[1].inventory_id;
    let batch = InventoryRepository::new(&pool)
        .get(destination)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(batch.department_id, fx.ward);
    assert_eq!(batch.batch_number.as_deref(), Some("B-7"));
    assert_eq!(batch.expiry_date, Some(expiry));
    assert_eq!(batch.quantity, 15);
    assert_eq!(batch_quantity(&pool, source).await, 25);
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_transfer_to_same_department_is_refused(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let source = fx.restock(&pool, "B-7", 40, days_ahead(365), price(3)).await;

    let result = fx
        .ledger(&pool)
        .transfer(
            fx.admin,
            &Transfer {
                inventory_id: source,
                quantity: 1,
                to_department: fx.pharmacy,
                notes: None,
            },
        )
        .await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_adjustment_cannot_go_negative(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let ledger = fx.ledger(&pool);
    let batch = fx.restock(&pool, "B-1", 10, days_ahead(365), price(3)).await;

    let down = ledger
        .adjust(
            fx.admin,
            &Adjustment {
                inventory_id: batch,
                delta: -11,
                notes: None,
                new_expiry: None,
            },
        )
        .await;
    assert!(matches!(down, Err(ServiceError::Conflict(_))));

    let up = ledger
        .adjust(
            fx.admin,
            &Adjustment {
                inventory_id: batch,
                delta: 4,
                notes: Some("count correction".to_string()),
                new_expiry: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(up.transaction.transaction_type, TransactionType::StockAdjustIn);
    assert_eq!(up.transaction.quantity, 4);
    assert_eq!(batch_quantity(&pool, batch).await, 14);
}

// ============================================================================
// Reversal
// ============================================================================

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_reversing_a_sale_restores_each_batch(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let ledger = fx.ledger(&pool);
    let early = fx.restock(&pool, "EARLY", 10, days_ahead(200), price(5)).await;
    let late = fx.restock(&pool, "LATE", 10, days_ahead(400), price(5)).await;
    let sale = ledger.record_sale(fx.admin, &dispense(&fx, 12)).await.unwrap();

    let reversal = ledger.reverse(fx.admin, sale.transaction.id).await.unwrap();
    assert_eq!(reversal.movements.len(), 2);
    assert_eq!(batch_quantity(&pool, early).await, 10);
    assert_eq!(batch_quantity(&pool, late).await, 10);

    let repo = TransactionRepository::new(&pool);
    assert!(repo.get(sale.transaction.id).await.unwrap().is_none());
    assert!(repo.movements(sale.transaction.id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_reversing_consumed_restock_is_refused(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let ledger = fx.ledger(&pool);
    let restock = ledger
        .restock(
            fx.admin,
            &pharmacy_web::services::ledger::Restock {
                drug_id: fx.drug,
                department_id: fx.pharmacy,
                supplier_id: fx.supplier,
                quantity: 10,
                batch_number: "B-1".to_string(),
                expiry_date: days_ahead(365),
                unit_price: price(2),
                notes: None,
            },
        )
        .await
        .unwrap();
    let batch = restock.movements[0].inventory_id;
    ledger.record_issue(fx.admin, &dispense(&fx, 4)).await.unwrap();

    let result = ledger.reverse(fx.admin, restock.transaction.id).await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));
    assert_eq!(batch_quantity(&pool, batch).await, 6);
    assert!(
        TransactionRepository::new(&pool)
            .get(restock.transaction.id)
            .await
            .unwrap()
            .is_some()
    );
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_worked_examples(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let ledger = fx.ledger(&pool);

    // Adjust 50 by -10.
    let counted = fx.restock(&pool, "COUNT", 50, days_ahead(300), price(1000)).await;
    let adjusted = ledger
        .adjust(
            fx.admin,
            &Adjustment {
                inventory_id: counted,
                delta: -10,
                notes: None,
                new_expiry: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(adjusted.transaction.transaction_type, TransactionType::StockAdjustOut);
    assert_eq!(adjusted.transaction.quantity, 10);
    assert_eq!(adjusted.movements[0].quantity_after, 40);

    // Transfer 10 of 30 to the ward.
    let moved = fx.restock(&pool, "MOVE", 30, days_ahead(320), price(1000)).await;
    let transfer = ledger
        .transfer(
            fx.admin,
            &Transfer {
                inventory_id: moved,
                quantity: 10,
                to_department: fx.ward,
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(transfer.movements[0].quantity_after, 20);
    assert_eq!(transfer.movements[1].quantity_after, 10);

    // Sell 5 at the latest purchase price of 1000.
    let sale = ledger.record_sale(fx.admin, &dispense(&fx, 5)).await.unwrap();
    assert_eq!(sale.transaction.unit_price, Some(price(1000)));
    assert_eq!(sale.transaction.total_amount, Some(price(5000)));
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_restock_with_new_expiry_opens_separate_batch(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let first = fx.restock(&pool, "B-100", 10, days_ahead(300), price(2)).await;
    let second = fx.restock(&pool, "B-100", 5, days_ahead(400), price(2)).await;

    assert_ne!(first, second);
    assert_eq!(batch_quantity(&pool, first).await, 10);
    assert_eq!(batch_quantity(&pool, second).await, 5);
    let batch = InventoryRepository::new(&pool).get(second).await.unwrap().unwrap();
    assert_eq!(batch.expiry_date, Some(days_ahead(400)));
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_each_operation_writes_one_transaction(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let ledger = fx.ledger(&pool);
    let early = fx.restock(&pool, "EARLY", 10, days_ahead(200), price(5)).await;
    fx.restock(&pool, "LATE", 10, days_ahead(400), price(5)).await;
    assert_eq!(row_count(&pool, "SELECT COUNT(*) FROM transactions").await, 2);
    assert_eq!(row_count(&pool, "SELECT COUNT(*) FROM stock_movements").await, 2);

    // A sale spanning two batches is still a single transaction.
    ledger.record_sale(fx.admin, &dispense(&fx, 12)).await.unwrap();
    assert_eq!(row_count(&pool, "SELECT COUNT(*) FROM transactions").await, 3);
    assert_eq!(row_count(&pool, "SELECT COUNT(*) FROM stock_movements").await, 4);

    ledger.record_return(fx.admin, &dispense(&fx, 1)).await.unwrap();
    ledger.record_issue(fx.admin, &dispense(&fx, 1)).await.unwrap();
    ledger.adjust(fx.admin, &adjustment(early, 3, None)).await.unwrap();
    ledger.transfer(fx.admin, &transfer(early, 2, &fx)).await.unwrap();
    assert_eq!(row_count(&pool, "SELECT COUNT(*) FROM transactions").await, 7);
    assert_eq!(row_count(&pool, "SELECT COUNT(*) FROM stock_movements").await, 9);

    // Refused operations leave nothing behind.
    assert!(ledger.record_sale(fx.admin, &dispense(&fx, 100)).await.is_err());
    assert!(ledger.transfer(fx.admin, &transfer(early, 100, &fx)).await.is_err());
    assert_eq!(row_count(&pool, "SELECT COUNT(*) FROM transactions").await, 7);
    assert_eq!(row_count(&pool, "SELECT COUNT(*) FROM stock_movements").await, 9);
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_issue_skips_expired_batch(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let ledger = fx.ledger(&pool);
    let stale = fx.restock(&pool, "STALE", 10, days_ahead(300), price(3)).await;
    let fresh = fx.restock(&pool, "FRESH", 10, days_ahead(400), price(3)).await;
    ledger
        .adjust(fx.admin, &adjustment(stale, 1, Some(days_ahead(-1))))
        .await
        .unwrap();

    let issue = ledger.record_issue(fx.admin, &dispense(&fx, 4)).await.unwrap();
    assert_eq!(issue.movements.len(), 1);
    assert_eq!(issue.movements[0].inventory_id, fresh);
    assert_eq!(batch_quantity(&pool, stale).await, 11);
    assert_eq!(batch_quantity(&pool, fresh).await, 6);

    // Only the fresh batch counts towards what can be issued.
    let short = ledger.record_issue(fx.admin, &dispense(&fx, 7)).await;
    assert!(matches!(short, Err(ServiceError::Conflict(_))));
    assert_eq!(batch_quantity(&pool, stale).await, 11);
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_transfer_beyond_stock_changes_neither_side(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let ledger = fx.ledger(&pool);
    let source = fx.restock(&pool, "B-7", 20, days_ahead(365), price(3)).await;
    let destination = ledger
        .transfer(fx.admin, &transfer(source, 5, &fx))
        .await
        .unwrap()
        .movements[1]
        .inventory_id;

    let result = ledger.transfer(fx.admin, &transfer(source, 16, &fx)).await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));
    assert_eq!(batch_quantity(&pool, source).await, 15);
    assert_eq!(batch_quantity(&pool, destination).await, 5);
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_adjust_onto_existing_expiry_is_refused(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let first = fx.restock(&pool, "B-1", 10, days_ahead(300), price(3)).await;
    let second = fx.restock(&pool, "B-1", 6, days_ahead(400), price(3)).await;

    let result = fx
        .ledger(&pool)
        .adjust(fx.admin, &adjustment(first, -2, Some(days_ahead(400))))
        .await;
    assert!(
        matches!(result, Err(ServiceError::Conflict(ref m)) if m.contains("already has that expiry"))
    );
    assert_eq!(batch_quantity(&pool, first).await, 10);
    assert_eq!(batch_quantity(&pool, second).await, 6);
    let batch = InventoryRepository::new(&pool).get(first).await.unwrap().unwrap();
    assert_eq!(batch.expiry_date, Some(days_ahead(300)));
    assert_eq!(row_count(&pool, "SELECT COUNT(*) FROM transactions").await, 2);
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_reversing_a_transfer_restores_both_legs(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let ledger = fx.ledger(&pool);
    let source = fx.restock(&pool, "B-7", 40, days_ahead(365), price(3)).await;
    let moved = ledger.transfer(fx.admin, &transfer(source, 15, &fx)).await.unwrap();
    let destination = moved.movements[1].inventory_id;

    let reversal = ledger.reverse(fx.admin, moved.transaction.id).await.unwrap();
    assert_eq!(reversal.transaction.transaction_type, TransactionType::Transfer);
    assert_eq!(reversal.movements.len(), 2);
    assert_eq!(batch_quantity(&pool, source).await, 40);
    assert_eq!(batch_quantity(&pool, destination).await, 0);
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_reversing_adjustments_returns_and_issues(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let ledger = fx.ledger(&pool);
    let batch = fx.restock(&pool, "B-1", 20, days_ahead(365), price(3)).await;

    let added = ledger.adjust(fx.admin, &adjustment(batch, 5, None)).await.unwrap();
    assert_eq!(batch_quantity(&pool, batch).await, 25);
    ledger.reverse(fx.admin, added.transaction.id).await.unwrap();
    assert_eq!(batch_quantity(&pool, batch).await, 20);

    let removed = ledger.adjust(fx.admin, &adjustment(batch, -8, None)).await.unwrap();
    assert_eq!(batch_quantity(&pool, batch).await, 12);
    ledger.reverse(fx.admin, removed.transaction.id).await.unwrap();
    assert_eq!(batch_quantity(&pool, batch).await, 20);

    let returned = ledger.record_return(fx.admin, &dispense(&fx, 3)).await.unwrap();
    assert_eq!(batch_quantity(&pool, batch).await, 23);
    ledger.reverse(fx.admin, returned.transaction.id).await.unwrap();
    assert_eq!(batch_quantity(&pool, batch).await, 20);

    let issued = ledger.record_issue(fx.admin, &dispense(&fx, 6)).await.unwrap();
    assert_eq!(batch_quantity(&pool, batch).await, 14);
    ledger.reverse(fx.admin, issued.transaction.id).await.unwrap();
    assert_eq!(batch_quantity(&pool, batch).await, 20);

    // Only the restock is left.
    assert_eq!(row_count(&pool, "SELECT COUNT(*) FROM transactions").await, 1);
    assert_eq!(row_count(&pool, "SELECT COUNT(*) FROM stock_movements").await, 1);
}

#[sqlx::test(migrations = "../web/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_empty_near_expiry_batch_still_blocks_sale(pool: PgPool) {
    let fx = Fixture::seed(&pool).await;
    let ledger = fx.ledger(&pool);
    let batch = fx.restock(&pool, "B-1", 20, days_ahead(365), price(5)).await;
    let other = fx.restock(&pool, "B-2", 20, days_ahead(500), price(5)).await;
    ledger
        .adjust(fx.admin, &adjustment(batch, -20, Some(days_ahead(5))))
        .await
        .unwrap();
    assert_eq!(batch_quantity(&pool, batch).await, 0);

    let sale = ledger.record_sale(fx.admin, &dispense(&fx, 1)).await;
    assert!(matches!(sale, Err(ServiceError::Conflict(ref m)) if m.contains("10 days")));
    assert_eq!(batch_quantity(&pool, other).await, 20);

    // Re-dating the empty batch lifts the block.
    ledger
        .adjust(fx.admin, &adjustment(batch, 1, Some(days_ahead(300))))
        .await
        .unwrap();
    ledger.record_sale(fx.admin, &dispense(&fx, 1)).await.unwrap();
}
