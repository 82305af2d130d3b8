//! Pure ledger rules.
//!
//! Everything here decides whether an operation may proceed and how it
//! splits across batches. Nothing touches the database, so the rules are
//! checked before the first write of every operation.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;

use pharmacy_core::{DepartmentId, InventoryId, TransactionType};

use crate::models::{InventoryBatch, StockMovement};
use crate::services::ServiceError;

/// Largest unit price a `NUMERIC(12, 2)` column holds.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Largest total a `NUMERIC(14, 2)` column holds.
pub const MAX_TOTAL: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Date rules applied by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPolicy {
    /// Sales are refused while any batch expires within this many days.
    pub sale_expiry_block_days: i64,
    /// Restocked batches must expire later than this many months from today.
    pub restock_min_shelf_life_months: u32,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            sale_expiry_block_days: 10,
            restock_min_shelf_life_months: 6,
        }
    }
}

impl LedgerPolicy {
    /// Last date on which an expiring batch blocks a sale.
    #[must_use]
    pub fn sale_block_horizon(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_add_signed(chrono::Duration::days(self.sale_expiry_block_days))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Restocked expiry dates must be strictly after this date.
    #[must_use]
    pub fn restock_min_expiry(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_add_months(Months::new(self.restock_min_shelf_life_months))
            .unwrap_or(NaiveDate::MAX)
    }
}

/// Require a strictly positive quantity.
pub(crate) fn require_positive(quantity: i32, message: &str) -> Result<(), ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::validation(message));
    }
    Ok(())
}

/// Validate the user-supplied parts of a restock.
pub(crate) fn check_restock(
    quantity: i32,
    unit_price: Decimal,
    batch_number: &str,
    expiry_date: NaiveDate,
    today: NaiveDate,
    policy: &LedgerPolicy,
) -> Result<(), ServiceError> {
    require_positive(quantity, "Restock quantity must be at least 1.")?;
    if unit_price <= Decimal::ZERO {
        return Err(ServiceError::validation("Unit price must be greater than zero."));
    }
    if unit_price.round_dp(2) != unit_price {
        return Err(ServiceError::validation(
            "Unit price cannot have more than two decimal places.",
        ));
    }
    if unit_price > MAX_UNIT_PRICE {
        return Err(ServiceError::validation("Unit price is too large."));
    }
    if batch_number.trim().is_empty() {
        return Err(ServiceError::validation("Batch number is required."));
    }
    if expiry_date <= policy.restock_min_expiry(today) {
        return Err(ServiceError::validation(format!(
            "Expiry date must be more than {} months from today.",
            policy.restock_min_shelf_life_months
        )));
    }
    Ok(())
}

/// Quantity after applying `delta` to `current`.
///
/// # Errors
///
/// Returns `Validation` for a zero delta or overflow and `Conflict` when the
/// result would be negative.
pub(crate) fn adjusted_quantity(current: i32, delta: i32) -> Result<i32, ServiceError> {
    if delta == 0 {
        return Err(ServiceError::validation("Adjustment quantity cannot be zero."));
    }
    let next = current
        .checked_add(delta)
        .ok_or_else(|| ServiceError::validation("Adjustment quantity is too large."))?;
    if next < 0 {
        return Err(ServiceError::conflict(
            "Adjustment would result in negative stock.",
        ));
    }
    Ok(next)
}

/// Transaction type recorded for an adjustment of `delta`.
#[must_use]
pub const fn adjustment_type(delta: i32) -> TransactionType {
    if delta > 0 {
        TransactionType::StockAdjustIn
    } else {
        TransactionType::StockAdjustOut
    }
}

/// Check a transfer of `quantity` out of `source` into `destination`.
pub(crate) fn check_transfer(
    source: &InventoryBatch,
    quantity: i32,
    destination: DepartmentId,
) -> Result<(), ServiceError> {
    require_positive(quantity, "Transfer quantity must be positive.")?;
    if destination == source.department_id {
        return Err(ServiceError::conflict("Cannot transfer to the same department."));
    }
    if source.quantity < quantity {
        return Err(ServiceError::conflict("Not enough stock for transfer."));
    }
    Ok(())
}

/// First batch that expires on or before `horizon`, if any.
///
/// Empty batches count too: a sale stays blocked until the expiring batch is
/// re-dated or its drug is restocked under a new batch.
#[must_use]
pub fn near_expiry_batch(batches: &[InventoryBatch], horizon: NaiveDate) -> Option<&InventoryBatch> {
    batches
        .iter()
        .find(|b| b.expiry_date.is_some_and(|expiry| expiry <= horizon))
}

/// Sum of on-hand quantity across batches.
#[must_use]
pub fn on_hand(batches: &[InventoryBatch]) -> i64 {
    batches.iter().map(|b| i64::from(b.quantity)).sum()
}

/// Split a debit of `quantity` across batches, first expiry first out.
///
/// Batches without an expiry are used last. Returns one `(batch, -taken)`
/// leg per batch touched.
///
/// # Errors
///
/// Returns `Conflict` when the batches together hold less than `quantity`.
pub(crate) fn plan_fefo_debit(
    batches: &[InventoryBatch],
    quantity: i32,
) -> Result<Vec<(InventoryId, i32)>, ServiceError> {
    let available = on_hand(batches);
    if available < i64::from(quantity) {
        return Err(ServiceError::conflict(format!(
            "Not enough stock available. Only {available} units in stock."
        )));
    }

    let mut ordered: Vec<&InventoryBatch> = batches.iter().filter(|b| b.quantity > 0).collect();
    ordered.sort_by_key(|b| (b.expiry_date.is_none(), b.expiry_date, b.id));

    let mut remaining = quantity;
    let mut legs = Vec::new();
    for batch in ordered {
        if remaining == 0 {
            break;
        }
        let taken = remaining.min(batch.quantity);
        legs.push((batch.id, -taken));
        remaining -= taken;
    }
    Ok(legs)
}

/// Batch that receives returned stock: latest expiry, undated batches last.
#[must_use]
pub fn return_target(batches: &[InventoryBatch]) -> Option<&InventoryBatch> {
    batches
        .iter()
        .max_by_key(|b| (b.expiry_date.is_some(), b.expiry_date, b.id))
}

/// `quantity x unit_price`.
///
/// # Errors
///
/// Returns `Validation` when the total does not fit the money columns.
pub fn extended_total(quantity: i32, unit_price: Decimal) -> Result<Decimal, ServiceError> {
    Decimal::from(quantity)
        .checked_mul(unit_price)
        .filter(|total| total.abs() <= MAX_TOTAL)
        .ok_or_else(|| ServiceError::validation("Total amount is too large."))
}

/// Legs that undo `movements`, in reverse order of application.
#[must_use]
pub fn inverse_legs(movements: &[StockMovement]) -> Vec<(InventoryId, i32)> {
    movements
        .iter()
        .rev()
        .map(|m| (m.inventory_id, -m.quantity_delta))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pharmacy_core::{DrugId, TransactionId};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn batch(id: i32, quantity: i32, expiry: Option<NaiveDate>) -> InventoryBatch {
        InventoryBatch {
            id: InventoryId::new(id),
            drug_id: DrugId::new(1),
            department_id: DepartmentId::new(1),
            quantity,
            batch_number: Some(format!("B{id}")),
            expiry_date: expiry,
            last_restocked: None,
        }
    }

    #[test]
    fn test_adjust_down_within_stock() {
        assert_eq!(adjusted_quantity(50, -10).unwrap(), 40);
        assert_eq!(adjustment_type(-10), TransactionType::StockAdjustOut);
        assert_eq!(adjustment_type(5), TransactionType::StockAdjustIn);
    }

    #[test]
    fn test_adjust_below_zero_is_conflict() {
        let err = adjusted_quantity(5, -6).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(adjusted_quantity(5, -5).unwrap(), 0);
    }

    #[test]
    fn test_adjust_zero_and_overflow_are_validation() {
        assert!(matches!(
            adjusted_quantity(5, 0).unwrap_err(),
            ServiceError::Validation(_)
        ));
        assert!(matches!(
            adjusted_quantity(i32::MAX, 1).unwrap_err(),
            ServiceError::Validation(_)
        ));
    }

    #[test]
    fn test_transfer_rules() {
        let source = batch(1, 30, Some(date(2027, 1, 1)));
        assert!(check_transfer(&source, 10, DepartmentId::new(2)).is_ok());
        assert!(matches!(
            check_transfer(&source, 31, DepartmentId::new(2)).unwrap_err(),
            ServiceError::Conflict(_)
        ));
        assert!(matches!(
            check_transfer(&source, 5, DepartmentId::new(1)).unwrap_err(),
            ServiceError::Conflict(_)
        ));
        assert!(matches!(
            check_transfer(&source, 0, DepartmentId::new(2)).unwrap_err(),
            ServiceError::Validation(_)
        ));
    }

    #[test]
    fn test_restock_shelf_life_boundary() {
        let policy = LedgerPolicy::default();
        let today = date(2026, 3, 15);
        let price = Decimal::new(1000, 0);

        // Exactly six months out is rejected; one day later is accepted.
        assert!(check_restock(10, price, "LOT-1", date(2026, 9, 15), today, &policy).is_err());
        assert!(check_restock(10, price, "LOT-1", date(2026, 9, 16), today, &policy).is_ok());
    }

    #[test]
    fn test_restock_rejects_bad_input() {
        let policy = LedgerPolicy::default();
        let today = date(2026, 3, 15);
        let expiry = date(2028, 1, 1);

        assert!(check_restock(0, Decimal::ONE, "LOT", expiry, today, &policy).is_err());
        assert!(check_restock(1, Decimal::ZERO, "LOT", expiry, today, &policy).is_err());
        assert!(check_restock(1, Decimal::ONE, "  ", expiry, today, &policy).is_err());
    }

    #[test]
    fn test_sale_blocked_by_any_near_expiry_batch() {
        let today = date(2026, 3, 1);
        let horizon = LedgerPolicy::default().sale_block_horizon(today);
        assert_eq!(horizon, date(2026, 3, 11));

        let batches = vec![
            batch(1, 500, Some(date(2027, 1, 1))),
            batch(2, 3, Some(date(2026, 3, 11))),
        ];
        assert_eq!(near_expiry_batch(&batches, horizon).unwrap().id, InventoryId::new(2));
    }

    #[test]
    fn test_empty_near_expiry_batch_still_blocks() {
        let today = date(2026, 3, 1);
        let horizon = LedgerPolicy::default().sale_block_horizon(today);
        let batches = vec![
            batch(1, 500, Some(date(2027, 1, 1))),
            batch(2, 0, Some(date(2026, 3, 5))),
        ];
        assert_eq!(near_expiry_batch(&batches, horizon).unwrap().id, InventoryId::new(2));

        let clear = vec![batch(1, 500, Some(date(2027, 1, 1))), batch(3, 10, None)];
        assert!(near_expiry_batch(&clear, horizon).is_none());
    }

    #[test]
    fn test_fefo_debit_spans_batches() {
        let batches = vec![
            batch(1, 5, None),
            batch(2, 4, Some(date(2027, 6, 1))),
            batch(3, 3, Some(date(2027, 1, 1))),
        ];
        let legs = plan_fefo_debit(&batches, 8).unwrap();
        assert_eq!(
            legs,
            vec![
                (InventoryId::new(3), -3),
                (InventoryId::new(2), -4),
                (InventoryId::new(1), -1),
            ]
        );
    }

    #[test]
    fn test_fefo_debit_insufficient() {
        let batches = vec![batch(1, 2, None), batch(2, 1, Some(date(2027, 1, 1)))];
        let err = plan_fefo_debit(&batches, 4).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Not enough stock available. Only 3 units in stock."
        );
    }

    #[test]
    fn test_return_target_prefers_latest_dated_batch() {
        let batches = vec![
            batch(1, 0, None),
            batch(2, 0, Some(date(2027, 6, 1))),
            batch(3, 0, Some(date(2027, 1, 1))),
        ];
        assert_eq!(return_target(&batches).unwrap().id, InventoryId::new(2));

        let undated = vec![batch(7, 0, None)];
        assert_eq!(return_target(&undated).unwrap().id, InventoryId::new(7));
        assert!(return_target(&[]).is_none());
    }

    #[test]
    fn test_extended_total() {
        assert_eq!(extended_total(5, Decimal::new(1000, 0)).unwrap(), Decimal::new(5000, 0));
        assert_eq!(extended_total(3, Decimal::new(1250, 2)).unwrap(), Decimal::new(3750, 2));
    }

    #[test]
    fn test_extended_total_overflow_is_validation() {
        assert!(matches!(
            extended_total(2, Decimal::MAX).unwrap_err(),
            ServiceError::Validation(_)
        ));
        assert!(matches!(
            extended_total(i32::MAX, MAX_UNIT_PRICE).unwrap_err(),
            ServiceError::Validation(_)
        ));
        assert_eq!(extended_total(1, MAX_UNIT_PRICE).unwrap(), MAX_UNIT_PRICE);
    }

    #[test]
    fn test_money_column_limits() {
        assert_eq!(MAX_UNIT_PRICE, Decimal::new(999_999_999_999, 2));
        assert_eq!(MAX_TOTAL, Decimal::new(99_999_999_999_999, 2));
    }

    #[test]
    fn test_restock_price_must_fit_column() {
        let policy = LedgerPolicy::default();
        let today = date(2026, 3, 15);
        let expiry = date(2028, 1, 1);

        let huge = check_restock(2, Decimal::MAX, "LOT", expiry, today, &policy);
        assert!(matches!(huge, Err(ServiceError::Validation(ref m)) if m == "Unit price is too large."));
        assert!(check_restock(2, MAX_UNIT_PRICE, "LOT", expiry, today, &policy).is_ok());

        for raw in ["0.001", "0.005", "12.345"] {
            let price: Decimal = raw.parse().unwrap();
            assert!(matches!(
                check_restock(3, price, "LOT", expiry, today, &policy),
                Err(ServiceError::Validation(_))
            ));
        }
        let trailing: Decimal = "12.500".parse().unwrap();
        assert!(check_restock(3, trailing, "LOT", expiry, today, &policy).is_ok());
    }

    #[test]
    fn test_inverse_legs_negate_in_reverse_order() {
        let tx = TransactionId::new(9);
        let movements = vec![
            StockMovement {
                transaction_id: tx,
                inventory_id: InventoryId::new(1),
                quantity_delta: -10,
            },
            StockMovement {
                transaction_id: tx,
                inventory_id: InventoryId::new(2),
                quantity_delta: 10,
            },
        ];
        assert_eq!(
            inverse_legs(&movements),
            vec![(InventoryId::new(2), -10), (InventoryId::new(1), 10)]
        );
    }
}
