//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats a money amount with two decimals and thousands separators.
///
/// Usage in templates: `{{ tx.total|money }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn money(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format_money(&value.to_string()))
}

/// Formats a timestamp as `YYYY-MM-DD HH:MM`.
///
/// Usage in templates: `{{ tx.created_at|datetime }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn datetime(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let raw = value.to_string();
    Ok(raw.get(..16).map_or_else(|| raw.clone(), str::to_string))
}

fn format_money(raw: &str) -> String {
    let Ok(amount) = Decimal::from_str(raw) else {
        return raw.to_string();
    };
    let fixed = format!("{:.2}", amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount.is_sign_negative() && !amount.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{cents}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money("5000"), "5,000.00");
        assert_eq!(format_money("1000.5"), "1,000.50");
        assert_eq!(format_money("-2000"), "-2,000.00");
        assert_eq!(format_money("12.345"), "12.35");
        assert_eq!(format_money("0"), "0.00");
        assert_eq!(format_money("1234567.8"), "1,234,567.80");
    }

    #[test]
    fn test_format_money_passes_through_non_numbers() {
        assert_eq!(format_money("n/a"), "n/a");
    }
}
