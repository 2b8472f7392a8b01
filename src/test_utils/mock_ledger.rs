//! An in-memory stand-in for the remote ledger with scriptable latency and failures.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::Mutex,
};

use rust_decimal::Decimal;
use tokio::sync::oneshot;

use crate::{
    Error,
    category::Category,
    client::{LedgerApi, ListFilter, Record, Resource},
    database_id::DatabaseId,
    pagination::{Page, PageSize},
    transaction::{CategoryTotal, Summary, Transaction, TransactionType},
};

/// The operations of [LedgerApi], used to script failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    List,
    Get,
    Create,
    Update,
    Delete,
    Summary,
    Suggest,
}

#[derive(Default)]
struct MockState {
    records: HashMap<Resource, BTreeMap<DatabaseId, serde_json::Value>>,
    next_id: DatabaseId,
    calls: HashMap<Op, usize>,
    failures: HashMap<Op, VecDeque<Error>>,
    list_gates: VecDeque<oneshot::Receiver<()>>,
    mutation_gates: VecDeque<oneshot::Receiver<()>>,
    suggestion_gates: VecDeque<oneshot::Receiver<()>>,
    suggestion_queries: Vec<String>,
}

/// Stores records as JSON, the way the server would, and pages them like the
/// server does: ascending by ID, with a 404 for a page past the end.
#[derive(Default)]
pub(crate) struct MockLedger {
    state: Mutex<MockState>,
}

impl MockLedger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Store `record` as if it had been created on the server.
    pub(crate) fn insert<R: Record>(&self, record: &R) {
        let mut state = self.state.lock().unwrap();
        let value = serde_json::to_value(record).expect("Could not serialize record");
        state.next_id = state.next_id.max(record.id());
        state
            .records
            .entry(R::RESOURCE)
            .or_default()
            .insert(record.id(), value);
    }

    /// Every stored record of type `R` in ID order.
    pub(crate) fn records<R: Record>(&self) -> Vec<R> {
        let state = self.state.lock().unwrap();
        Self::decode_all(&state, R::RESOURCE)
    }

    /// Hold the response to the next `list` call until the returned sender
    /// fires (or is dropped).
    pub(crate) fn hold_next_list(&self) -> oneshot::Sender<()> {
        let (sender, receiver) = oneshot::channel();
        self.state.lock().unwrap().list_gates.push_back(receiver);
        sender
    }

    /// Hold the next create, update or delete until the returned sender fires.
    pub(crate) fn hold_next_mutation(&self) -> oneshot::Sender<()> {
        let (sender, receiver) = oneshot::channel();
        self.state.lock().unwrap().mutation_gates.push_back(receiver);
        sender
    }

    /// Hold the next `suggest_categories` call until the returned sender fires.
    pub(crate) fn hold_next_suggestion(&self) -> oneshot::Sender<()> {
        let (sender, receiver) = oneshot::channel();
        self.state.lock().unwrap().suggestion_gates.push_back(receiver);
        sender
    }

    /// Make the next call of `op` fail with `error`.
    pub(crate) fn fail_next(&self, op: Op, error: Error) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// How many times `op` has been called.
    pub(crate) fn calls(&self, op: Op) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(&op)
            .copied()
            .unwrap_or(0)
    }

    /// The descriptions passed to `suggest_categories`, in call order.
    pub(crate) fn suggestion_queries(&self) -> Vec<String> {
        self.state.lock().unwrap().suggestion_queries.clone()
    }

    fn decode_all<R: Record>(state: &MockState, resource: Resource) -> Vec<R> {
        state
            .records
            .get(&resource)
            .map(|records| {
                records
                    .values()
                    .map(|value| {
                        serde_json::from_value(value.clone()).expect("Could not decode record")
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Count the call and take the gate that should delay it, if any.
    fn begin(&self, op: Op) -> Option<oneshot::Receiver<()>> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(op).or_default() += 1;

        match op {
            Op::List => state.list_gates.pop_front(),
            Op::Create | Op::Update | Op::Delete => state.mutation_gates.pop_front(),
            Op::Suggest => state.suggestion_gates.pop_front(),
            Op::Get | Op::Summary => None,
        }
    }

    async fn enter(&self, op: Op) -> Result<(), Error> {
        if let Some(gate) = self.begin(op) {
            // A dropped sender releases the call too.
            let _ = gate.await;
        }

        let mut state = self.state.lock().unwrap();

        match state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn not_found() -> Error {
        Error::Client {
            status: 404,
            body: r#"{"detail":"Not found."}"#.to_owned(),
        }
    }

    fn store<R: Record>(&self, id: DatabaseId, payload: &R::Payload) -> Result<R, Error> {
        let mut value = serde_json::to_value(payload).expect("Could not serialize payload");
        value["id"] = serde_json::json!(id);

        let record: R = serde_json::from_value(value.clone()).map_err(|error| Error::Client {
            status: 400,
            body: serde_json::json!({ "non_field_errors": [error.to_string()] }).to_string(),
        })?;

        self.state
            .lock()
            .unwrap()
            .records
            .entry(R::RESOURCE)
            .or_default()
            .insert(id, value);

        Ok(record)
    }
}

impl LedgerApi for MockLedger {
    async fn list<R: Record>(
        &self,
        filter: &R::Filter,
        page_number: u64,
        page_size: PageSize,
    ) -> Result<Page<R>, Error> {
        self.enter(Op::List).await?;

        let state = self.state.lock().unwrap();
        let matching: Vec<R> = Self::decode_all::<R>(&state, R::RESOURCE)
            .into_iter()
            .filter(|record| filter.matches(record))
            .collect();

        let total_count = matching.len() as u64;
        let last_page = crate::pagination::total_pages(total_count, page_size);

        if page_number > last_page {
            return Err(Error::Client {
                status: 404,
                body: r#"{"detail":"Invalid page."}"#.to_owned(),
            });
        }

        let items = matching
            .into_iter()
            .skip(((page_number - 1) * page_size.get()) as usize)
            .take(page_size.get() as usize)
            .collect();

        Ok(Page::new(items, page_number, page_size, total_count))
    }

    async fn get<R: Record>(&self, id: DatabaseId) -> Result<R, Error> {
        self.enter(Op::Get).await?;

        Self::decode_all::<R>(&self.state.lock().unwrap(), R::RESOURCE)
            .into_iter()
            .find(|record| record.id() == id)
            .ok_or_else(Self::not_found)
    }

    async fn create<R: Record>(&self, payload: &R::Payload) -> Result<R, Error> {
        self.enter(Op::Create).await?;

        let id = {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            state.next_id
        };

        self.store(id, payload)
    }

    async fn update<R: Record>(&self, id: DatabaseId, payload: &R::Payload) -> Result<R, Error> {
        self.enter(Op::Update).await?;

        let exists = self
            .state
            .lock()
            .unwrap()
            .records
            .get(&R::RESOURCE)
            .is_some_and(|records| records.contains_key(&id));

        if !exists {
            return Err(Self::not_found());
        }

        self.store(id, payload)
    }

    async fn delete<R: Record>(&self, id: DatabaseId) -> Result<(), Error> {
        self.enter(Op::Delete).await?;

        let mut state = self.state.lock().unwrap();
        let removed = state
            .records
            .get_mut(&R::RESOURCE)
            .and_then(|records| records.remove(&id));

        if removed.is_none() {
            return Err(Self::not_found());
        }

        // The server detaches transactions from a deleted category.
        if R::RESOURCE == Resource::Categories {
            if let Some(transactions) = state.records.get_mut(&Resource::Transactions) {
                for transaction in transactions.values_mut() {
                    if transaction["category"] == serde_json::json!(id) {
                        transaction["category"] = serde_json::Value::Null;
                    }
                }
            }
        }

        Ok(())
    }

    async fn summary(&self) -> Result<Summary, Error> {
        self.enter(Op::Summary).await?;

        let state = self.state.lock().unwrap();
        let transactions: Vec<Transaction> = Self::decode_all(&state, Resource::Transactions);
        let categories: Vec<Category> = Self::decode_all(&state, Resource::Categories);

        let sum = |transaction_type| {
            transactions
                .iter()
                .filter(|t| t.transaction_type == transaction_type)
                .map(|t| t.value)
                .sum::<Decimal>()
        };
        let total_income = sum(TransactionType::Income);
        let total_expense = sum(TransactionType::Expense);

        let by_category = categories
            .iter()
            .map(|category| CategoryTotal {
                name: category.name.to_string(),
                total: transactions
                    .iter()
                    .filter(|t| t.is_expense() && t.category_id == Some(category.id))
                    .map(|t| t.value)
                    .sum(),
                color: category.color.clone(),
            })
            .collect();

        Ok(Summary {
            total_income,
            total_expense,
            balance: total_income - total_expense,
            by_category,
        })
    }

    async fn suggest_categories(&self, description: &str) -> Result<Vec<String>, Error> {
        self.enter(Op::Suggest).await?;

        let mut state = self.state.lock().unwrap();
        state.suggestion_queries.push(description.to_owned());

        let description = description.to_lowercase();
        let categories: Vec<Category> = Self::decode_all(&state, Resource::Categories);

        Ok(categories
            .into_iter()
            .map(|category| category.name.to_string())
            .filter(|name| description.contains(&name.to_lowercase()))
            .take(3)
            .collect())
    }
}
