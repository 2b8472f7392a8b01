//! Defines the core data models for transactions.

use std::{fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    category::Color,
    client::{Record, Resource},
    database_id::{CategoryId, DatabaseId, TransactionId},
};

use super::filter::TransactionFilter;

/// Whether money was spent or earned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money that was spent.
    Expense,
    /// Money that was earned.
    Income,
}

impl TransactionType {
    /// The value the server expects in the `tipo` query parameter.
    pub fn as_query_value(self) -> &'static str {
        match self {
            TransactionType::Expense => "expense",
            TransactionType::Income => "income",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_query_value())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "expense" => Ok(TransactionType::Expense),
            "income" => Ok(TransactionType::Income),
            other => Err(format!(
                "unknown transaction type \"{other}\", expected \"expense\" or \"income\""
            )),
        }
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// The category reference may be stale: deleting a category on the server sets
/// the reference of its transactions to `None`, but a page fetched before that
/// may still hold the old ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The amount of money spent or earned, always positive.
    pub value: Decimal,
    /// Whether the money was spent or earned.
    pub transaction_type: TransactionType,
    /// When the transaction happened.
    pub date: Date,
    /// The ID of the category the transaction belongs to.
    #[serde(rename = "category", default)]
    pub category_id: Option<CategoryId>,
    /// The name of the category, filled in by the server for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    /// The colour of the category, filled in by the server for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_color: Option<Color>,
}

impl Transaction {
    /// Whether this transaction counts towards spending.
    pub fn is_expense(&self) -> bool {
        self.transaction_type == TransactionType::Expense
    }

    /// The value with a sign, negative for expenses and positive for income.
    pub fn signed_value(&self) -> Decimal {
        match self.transaction_type {
            TransactionType::Expense => -self.value,
            TransactionType::Income => self.value,
        }
    }
}

impl Record for Transaction {
    const RESOURCE: Resource = Resource::Transactions;
    type Payload = TransactionData;
    type Filter = TransactionFilter;

    fn id(&self) -> DatabaseId {
        self.id
    }
}

/// The payload for creating or replacing a transaction.
///
/// To create a new `TransactionData`, use [TransactionData::new].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionData {
    /// A human-readable description of the transaction, e.g. `"Groceries"`.
    pub description: String,

    /// The amount of money that moved. Must be greater than zero, the
    /// direction is given by `transaction_type`.
    pub value: Decimal,

    /// Whether the money was spent or earned.
    pub transaction_type: TransactionType,

    /// The date when the transaction occurred.
    pub date: Date,

    /// The category of the transaction, e.g. "Groceries", "Transport", "Rent".
    ///
    /// Must refer to an existing category when the payload is sent.
    #[serde(rename = "category")]
    pub category_id: Option<CategoryId>,
}

impl TransactionData {
    /// Create a transaction payload without a category.
    ///
    /// # Errors
    ///
    /// Returns [Error::EmptyDescription] if `description` is blank and
    /// [Error::NonPositiveValue] if `value` is zero or negative.
    pub fn new(
        description: &str,
        value: Decimal,
        transaction_type: TransactionType,
        date: Date,
    ) -> Result<Self, Error> {
        let description = description.trim();

        if description.is_empty() {
            return Err(Error::EmptyDescription);
        }

        if value <= Decimal::ZERO {
            return Err(Error::NonPositiveValue(value));
        }

        Ok(Self {
            description: description.to_owned(),
            value,
            transaction_type,
            date,
            category_id: None,
        })
    }

    /// Set the category for the transaction.
    pub fn category(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }
}

impl From<&Transaction> for TransactionData {
    fn from(transaction: &Transaction) -> Self {
        Self {
            description: transaction.description.clone(),
            value: transaction.value,
            transaction_type: transaction.transaction_type,
            date: transaction.date,
            category_id: transaction.category_id,
        }
    }
}
