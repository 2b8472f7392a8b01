//! Derives spend-vs-limit progress for categories.
//!
//! Everything here is a pure function of its inputs. Budget statuses are never
//! stored, callers recompute them from fresh data after every change.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;

use crate::{
    category::Category,
    database_id::CategoryId,
    transaction::{Summary, Transaction},
};

/// Where spending per category is read from.
#[derive(Debug, Clone, Copy)]
pub enum SpendSource<'a> {
    /// Sum the expense transactions of each category.
    Transactions(&'a [Transaction]),
    /// Use the server's per-category expense totals, matched by category name.
    ///
    /// Categories whose name is shared with another category get no spend
    /// from the summary, see [has_shared_names].
    Summary(&'a Summary),
}

/// How much has been spent in a category against its monthly limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetStatus {
    /// The category the status belongs to.
    pub category_id: CategoryId,
    /// The total spent, never negative.
    pub spent: Decimal,
    /// The category's monthly limit, if it has one.
    pub limit: Option<Decimal>,
    /// `spent / limit`, absent when there is no positive limit.
    pub ratio: Option<Decimal>,
    /// Whether more than the limit has been spent.
    pub exceeded: bool,
}

impl BudgetStatus {
    /// The ratio clamped to `[0, 1]`, suitable for drawing a progress bar.
    pub fn progress(&self) -> Option<Decimal> {
        self.ratio.map(|ratio| ratio.min(Decimal::ONE))
    }

    /// How much is left before the limit is reached, negative once exceeded.
    pub fn remaining(&self) -> Option<Decimal> {
        self.limit
            .filter(|limit| *limit > Decimal::ZERO)
            .map(|limit| limit - self.spent)
    }
}

/// Compute the budget status of every category, in the order given.
///
/// Only expense transactions count as spending. Transactions that reference a
/// category not in `categories` are ignored, as are transactions without a
/// category. A limit of zero or less is treated as no limit: there is no
/// ratio and the category is never exceeded.
pub fn compute_budget_status(categories: &[Category], source: SpendSource) -> Vec<BudgetStatus> {
    let spent_by_category = match source {
        SpendSource::Transactions(transactions) => spend_from_transactions(transactions),
        SpendSource::Summary(summary) => spend_from_summary(categories, summary),
    };

    categories
        .iter()
        .map(|category| {
            let spent = spent_by_category
                .get(&category.id)
                .copied()
                .unwrap_or(Decimal::ZERO);

            budget_status(category, spent)
        })
        .collect()
}

fn budget_status(category: &Category, spent: Decimal) -> BudgetStatus {
    let positive_limit = category
        .monthly_limit
        .filter(|limit| *limit > Decimal::ZERO);

    let ratio = positive_limit.and_then(|limit| spent.checked_div(limit));
    let exceeded = positive_limit.is_some_and(|limit| spent > limit);

    BudgetStatus {
        category_id: category.id,
        spent,
        limit: category.monthly_limit,
        ratio,
        exceeded,
    }
}

fn spend_from_transactions(transactions: &[Transaction]) -> HashMap<CategoryId, Decimal> {
    let mut totals = HashMap::new();

    for transaction in transactions.iter().filter(|t| t.is_expense()) {
        if let Some(category_id) = transaction.category_id {
            *totals.entry(category_id).or_insert(Decimal::ZERO) += transaction.value.abs();
        }
    }

    totals
}

fn spend_from_summary(categories: &[Category], summary: &Summary) -> HashMap<CategoryId, Decimal> {
    let mut totals_by_name: HashMap<&str, Decimal> = HashMap::new();

    for total in &summary.by_category {
        *totals_by_name
            .entry(total.name.as_str())
            .or_insert(Decimal::ZERO) += total.total.abs();
    }

    let mut ids_by_name: HashMap<&str, Vec<CategoryId>> = HashMap::new();

    for category in categories {
        ids_by_name
            .entry(category.name.as_ref())
            .or_default()
            .push(category.id);
    }

    // A name shared by several categories cannot be split between them.
    ids_by_name
        .into_iter()
        .filter_map(|(name, ids)| {
            let total = totals_by_name.get(name)?;

            match ids.as_slice() {
                [id] => Some((*id, *total)),
                _ => {
                    tracing::warn!(
                        "{} categories are named \"{name}\", ignoring their summary total",
                        ids.len()
                    );
                    None
                }
            }
        })
        .collect()
}

/// Whether two or more of `categories` share a name, in which case the
/// summary totals cannot be attributed to them.
pub fn has_shared_names(categories: &[Category]) -> bool {
    let mut seen: HashSet<&str> = HashSet::new();

    categories
        .iter()
        .any(|category| !seen.insert(category.name.as_ref()))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        budget::{BudgetStatus, SpendSource, compute_budget_status, has_shared_names},
        category::{Category, CategoryName},
        transaction::{CategoryTotal, Summary, Transaction, TransactionType},
    };

    fn category(id: i64, name: &str, monthly_limit: Option<Decimal>) -> Category {
        Category {
            id,
            name: CategoryName::new_unchecked(name),
            color: None,
            monthly_limit,
        }
    }

    fn transaction(
        id: i64,
        value: Decimal,
        transaction_type: TransactionType,
        category_id: Option<i64>,
    ) -> Transaction {
        Transaction {
            id,
            description: format!("transaction #{id}"),
            value,
            transaction_type,
            date: date!(2025 - 06 - 01),
            category_id,
            category_name: None,
            category_color: None,
        }
    }

    fn transactions() -> Vec<Transaction> {
        vec![
            transaction(1, dec!(100), TransactionType::Expense, Some(1)),
            transaction(2, dec!(250.50), TransactionType::Expense, Some(1)),
            transaction(3, dec!(1000), TransactionType::Income, Some(1)),
            transaction(4, dec!(40), TransactionType::Expense, Some(2)),
            transaction(5, dec!(15), TransactionType::Expense, None),
            transaction(6, dec!(60), TransactionType::Expense, Some(404)),
        ]
    }

    #[test]
    fn spend_sums_expenses_per_category() {
        let categories = [category(1, "Food", None), category(2, "Bus", None)];

        let got = compute_budget_status(&categories, SpendSource::Transactions(&transactions()));

        assert_eq!(got[0].spent, dec!(350.50));
        assert_eq!(got[1].spent, dec!(40));
    }

    #[test]
    fn income_never_counts_as_spend() {
        let categories = [category(1, "Salary", Some(dec!(10)))];
        let transactions = [transaction(1, dec!(5000), TransactionType::Income, Some(1))];

        let got = compute_budget_status(&categories, SpendSource::Transactions(&transactions));

        assert_eq!(got[0].spent, Decimal::ZERO);
        assert!(!got[0].exceeded);
    }

    #[test]
    fn spend_is_invariant_under_reordering() {
        let categories = [category(1, "Food", Some(dec!(300))), category(2, "Bus", None)];
        let forward = transactions();
        let mut reversed = forward.clone();
        reversed.reverse();
        let mut rotated = forward.clone();
        rotated.rotate_left(2);

        let want = compute_budget_status(&categories, SpendSource::Transactions(&forward));

        assert_eq!(
            want,
            compute_budget_status(&categories, SpendSource::Transactions(&reversed))
        );
        assert_eq!(
            want,
            compute_budget_status(&categories, SpendSource::Transactions(&rotated))
        );
    }

    #[test]
    fn same_input_gives_same_output() {
        let categories = [category(1, "Food", Some(dec!(300)))];
        let transactions = transactions();

        let first = compute_budget_status(&categories, SpendSource::Transactions(&transactions));
        let second = compute_budget_status(&categories, SpendSource::Transactions(&transactions));

        assert_eq!(first, second);
    }

    #[test]
    fn over_limit_category_is_exceeded() {
        let categories = [category(1, "Food", Some(dec!(500)))];
        let transactions = [transaction(1, dec!(600), TransactionType::Expense, Some(1))];

        let got = compute_budget_status(&categories, SpendSource::Transactions(&transactions));

        assert_eq!(
            got,
            vec![BudgetStatus {
                category_id: 1,
                spent: dec!(600),
                limit: Some(dec!(500)),
                ratio: Some(dec!(1.2)),
                exceeded: true,
            }]
        );
        assert_eq!(got[0].progress(), Some(Decimal::ONE));
        assert_eq!(got[0].remaining(), Some(dec!(-100)));
    }

    #[test]
    fn spending_exactly_the_limit_is_not_exceeded() {
        let categories = [category(1, "Food", Some(dec!(50)))];
        let transactions = [transaction(1, dec!(50), TransactionType::Expense, Some(1))];

        let got = compute_budget_status(&categories, SpendSource::Transactions(&transactions));

        assert_eq!(got[0].ratio, Some(Decimal::ONE));
        assert!(!got[0].exceeded);
    }

    #[test]
    fn absent_or_non_positive_limit_has_no_ratio() {
        let categories = [
            category(1, "None", None),
            category(2, "Zero", Some(Decimal::ZERO)),
            category(3, "Negative", Some(dec!(-20))),
        ];
        let transactions = [
            transaction(1, dec!(10), TransactionType::Expense, Some(1)),
            transaction(2, dec!(10), TransactionType::Expense, Some(2)),
            transaction(3, dec!(10), TransactionType::Expense, Some(3)),
        ];

        let got = compute_budget_status(&categories, SpendSource::Transactions(&transactions));

        for status in got {
            assert_eq!(status.ratio, None, "{status:?}");
            assert!(!status.exceeded, "{status:?}");
            assert_eq!(status.remaining(), None, "{status:?}");
        }
    }

    #[test]
    fn category_without_transactions_has_zero_spend() {
        let categories = [category(9, "Unused", Some(dec!(100)))];

        let got = compute_budget_status(&categories, SpendSource::Transactions(&[]));

        assert_eq!(got[0].spent, Decimal::ZERO);
        assert_eq!(got[0].ratio, Some(Decimal::ZERO));
    }

    #[test]
    fn summary_totals_are_matched_by_name() {
        let categories = [
            category(1, "Food", Some(dec!(200))),
            category(2, "Rent", Some(dec!(1000))),
        ];
        let summary = Summary {
            total_income: dec!(3000),
            total_expense: dec!(1250),
            balance: dec!(1750),
            by_category: vec![
                CategoryTotal {
                    name: "Food".to_owned(),
                    total: dec!(250),
                    color: None,
                },
                CategoryTotal {
                    name: "Deleted".to_owned(),
                    total: dec!(1000),
                    color: None,
                },
            ],
        };

        let got = compute_budget_status(&categories, SpendSource::Summary(&summary));

        assert_eq!(got[0].spent, dec!(250));
        assert!(got[0].exceeded);
        assert_eq!(got[0].ratio, Some(dec!(1.25)));
        assert_eq!(got[1].spent, Decimal::ZERO);
        assert!(!got[1].exceeded);
    }

    #[test]
    fn shared_summary_name_is_not_counted_twice() {
        let categories = [
            category(1, "Food", Some(dec!(150))),
            category(2, "Food", Some(dec!(150))),
            category(3, "Rent", Some(dec!(150))),
        ];
        let summary = Summary {
            total_income: Decimal::ZERO,
            total_expense: dec!(260),
            balance: dec!(-260),
            by_category: ["Food", "Food", "Rent"]
                .into_iter()
                .zip([dec!(100), dec!(100), dec!(60)])
                .map(|(name, total)| CategoryTotal {
                    name: name.to_owned(),
                    total,
                    color: None,
                })
                .collect(),
        };

        let got = compute_budget_status(&categories, SpendSource::Summary(&summary));

        assert_eq!(got[0].spent, Decimal::ZERO);
        assert!(!got[0].exceeded);
        assert_eq!(got[1].spent, Decimal::ZERO);
        assert!(!got[1].exceeded);
        assert_eq!(got[2].spent, dec!(60));
        assert!(has_shared_names(&categories));
        assert!(!has_shared_names(&categories[1..]));
    }
}
