//! The server-computed totals across all of the user's transactions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::category::Color;

/// Totals returned by the `transactions/summary` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// The sum of all income.
    pub total_income: Decimal,
    /// The sum of all expenses.
    pub total_expense: Decimal,
    /// Income minus expenses.
    pub balance: Decimal,
    /// Expense totals per category.
    #[serde(default)]
    pub by_category: Vec<CategoryTotal>,
}

/// The expense total for one category in a [Summary].
///
/// The server identifies categories by name here, not by ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// The category name.
    pub name: String,
    /// The total spent in the category.
    pub total: Decimal,
    /// The category colour.
    #[serde(default)]
    pub color: Option<Color>,
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::Summary;

    #[test]
    fn deserializes_summary() {
        let summary: Summary = serde_json::from_str(
            r##"{
                "total_income": "1000.00",
                "total_expense": "250.50",
                "balance": "749.50",
                "by_category": [{"name": "Food", "total": "200.50", "color": "#ff0000"}]
            }"##,
        )
        .unwrap();

        assert_eq!(summary.balance, dec!(749.50));
        assert_eq!(summary.by_category.len(), 1);
        assert_eq!(summary.by_category[0].total, dec!(200.50));
    }
}
