//! Ledger transaction types.

use serde::{Deserialize, Serialize};

/// Kind of stock movement recorded in the ledger.
///
/// The quantity stored with a transaction is always a magnitude; the
/// direction of each affected batch is recorded separately as movements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "transaction_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Priced dispensing to a patient.
    Sale,
    /// Previously sold stock coming back; carries a negative total.
    Return,
    /// Internal consumption without pricing.
    Issue,
    /// Legacy manual correction. New corrections use the `StockAdjust*` kinds.
    Adjustment,
    /// Move between departments.
    Transfer,
    /// Incoming stock from a supplier.
    StockReceive,
    /// Manual correction that added stock.
    StockAdjustIn,
    /// Manual correction that removed stock.
    StockAdjustOut,
}

impl TransactionType {
    /// Types that can be recorded from the transactions screen.
    pub const RECORDABLE: [Self; 3] = [Self::Sale, Self::Return, Self::Issue];

    /// Stable identifier stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Return => "return",
            Self::Issue => "issue",
            Self::Adjustment => "adjustment",
            Self::Transfer => "transfer",
            Self::StockReceive => "stock_receive",
            Self::StockAdjustIn => "stock_adjust_in",
            Self::StockAdjustOut => "stock_adjust_out",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sale => "Sale",
            Self::Return => "Return",
            Self::Issue => "Issue",
            Self::Adjustment => "Adjustment",
            Self::Transfer => "Transfer",
            Self::StockReceive => "Stock Received",
            Self::StockAdjustIn => "Adjustment (in)",
            Self::StockAdjustOut => "Adjustment (out)",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sale" => Ok(Self::Sale),
            "return" => Ok(Self::Return),
            "issue" => Ok(Self::Issue),
            "adjustment" => Ok(Self::Adjustment),
            "transfer" => Ok(Self::Transfer),
            "stock_receive" => Ok(Self::StockReceive),
            "stock_adjust_in" => Ok(Self::StockAdjustIn),
            "stock_adjust_out" => Ok(Self::StockAdjustOut),
            _ => Err(format!("invalid transaction type: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_matches_display() {
        for kind in [
            TransactionType::Sale,
            TransactionType::Return,
            TransactionType::Issue,
            TransactionType::Adjustment,
            TransactionType::Transfer,
            TransactionType::StockReceive,
            TransactionType::StockAdjustIn,
            TransactionType::StockAdjustOut,
        ] {
            assert_eq!(kind.as_str().parse::<TransactionType>(), Ok(kind));
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!("refund".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_recordable_types() {
        assert!(TransactionType::RECORDABLE.contains(&TransactionType::Sale));
        assert!(!TransactionType::RECORDABLE.contains(&TransactionType::Transfer));
    }
}
