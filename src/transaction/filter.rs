//! The composable filter set for transaction listings.

use time::Date;

use crate::{client::ListFilter, database_id::CategoryId};

use super::core::{Transaction, TransactionType};

/// Narrows a transaction listing. A `None` field places no constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransactionFilter {
    /// Only include expenses or only income.
    pub transaction_type: Option<TransactionType>,
    /// Only include transactions in this category.
    pub category_id: Option<CategoryId>,
    /// Only include transactions on this date.
    pub date: Option<Date>,
}

impl TransactionFilter {
    /// A filter that matches every transaction.
    pub fn any() -> Self {
        Self::default()
    }

    /// Constrain the transaction type.
    pub fn transaction_type(mut self, transaction_type: Option<TransactionType>) -> Self {
        self.transaction_type = transaction_type;
        self
    }

    /// Constrain the category.
    pub fn category(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Constrain the date.
    pub fn date(mut self, date: Option<Date>) -> Self {
        self.date = date;
        self
    }

    /// Whether no field is constrained.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl ListFilter<Transaction> for TransactionFilter {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if let Some(transaction_type) = self.transaction_type {
            pairs.push(("tipo", transaction_type.as_query_value().to_owned()));
        }

        if let Some(category_id) = self.category_id {
            pairs.push(("categoria", category_id.to_string()));
        }

        if let Some(date) = self.date {
            pairs.push(("data", date.to_string()));
        }

        pairs
    }

    fn matches(&self, transaction: &Transaction) -> bool {
        self.transaction_type
            .is_none_or(|transaction_type| transaction.transaction_type == transaction_type)
            && self
                .category_id
                .is_none_or(|category_id| transaction.category_id == Some(category_id))
            && self.date.is_none_or(|date| transaction.date == date)
    }
}
