//! The entry point that ties the listing surfaces and mutations together.

use std::sync::Arc;

use time::{Date, Month};

use crate::{
    Error,
    budget::{BudgetStatus, SpendSource, compute_budget_status, has_shared_names},
    category::{Category, CategoryData},
    client::{HttpLedgerClient, LedgerApi, ListFilter, Record},
    config::LedgerConfig,
    database_id::{CategoryId, DatabaseId, TransactionId},
    listing::{ListingEngine, ListingState},
    mutation::{Mutation, MutationCoordinator, MutationOutcome},
    pagination::PageSize,
    session::SessionStore,
    suggest::CategorySuggester,
    transaction::{Summary, Transaction, TransactionData, TransactionFilter, TransactionType},
};

/// A user's ledger as seen by the client: one listing per resource plus the
/// operations that change them.
pub struct Ledger<A> {
    api: Arc<A>,
    transactions: ListingEngine<Transaction, A>,
    categories: ListingEngine<Category, A>,
    mutations: MutationCoordinator<A>,
    suggester: CategorySuggester<A>,
}

impl<S: SessionStore> Ledger<HttpLedgerClient<S>> {
    /// Connect to the remote ledger described by `config`, authenticating
    /// with the token held by `session`.
    pub fn connect(config: &LedgerConfig, session: Arc<S>) -> Result<Self, Error> {
        let client = HttpLedgerClient::new(config, session)?;

        Ok(Self::new(Arc::new(client), config))
    }
}

impl<A: LedgerApi> Ledger<A> {
    /// Create a ledger on top of `api`.
    pub fn new(api: Arc<A>, config: &LedgerConfig) -> Self {
        Self {
            transactions: ListingEngine::new(api.clone(), &config.pagination),
            categories: ListingEngine::new(api.clone(), &config.pagination),
            mutations: MutationCoordinator::new(api.clone(), config),
            suggester: CategorySuggester::new(api.clone(), config.suggestion_debounce),
            api,
        }
    }

    /// The client used to talk to the remote ledger.
    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    /// The transaction listing.
    pub fn transactions(&self) -> &ListingEngine<Transaction, A> {
        &self.transactions
    }

    /// The category listing.
    pub fn categories(&self) -> &ListingEngine<Category, A> {
        &self.categories
    }

    /// Category suggestions for the transaction form.
    pub fn suggester(&self) -> &CategorySuggester<A> {
        &self.suggester
    }

    /// Create a transaction and refresh the transaction listing.
    pub async fn create_transaction(&self, data: TransactionData) -> Result<Transaction, Error> {
        match self
            .mutations
            .submit(Mutation::Create(data), &self.transactions)
            .await?
        {
            MutationOutcome::Created(transaction) | MutationOutcome::Updated(transaction) => {
                Ok(transaction)
            }
            MutationOutcome::Deleted(id) => Err(unexpected_outcome::<Transaction>(id)),
        }
    }

    /// Replace a transaction and refresh the transaction listing.
    pub async fn update_transaction(
        &self,
        id: TransactionId,
        data: TransactionData,
    ) -> Result<Transaction, Error> {
        match self
            .mutations
            .submit(Mutation::Update(id, data), &self.transactions)
            .await?
        {
            MutationOutcome::Created(transaction) | MutationOutcome::Updated(transaction) => {
                Ok(transaction)
            }
            MutationOutcome::Deleted(id) => Err(unexpected_outcome::<Transaction>(id)),
        }
    }

    /// Delete a transaction and refresh the transaction listing.
    pub async fn delete_transaction(&self, id: TransactionId) -> Result<(), Error> {
        self.mutations
            .submit(Mutation::Delete(id), &self.transactions)
            .await
            .map(|_| ())
    }

    /// Create a category and refresh the category listing.
    pub async fn create_category(&self, data: CategoryData) -> Result<Category, Error> {
        match self
            .mutations
            .submit(Mutation::Create(data), &self.categories)
            .await?
        {
            MutationOutcome::Created(category) | MutationOutcome::Updated(category) => {
                Ok(category)
            }
            MutationOutcome::Deleted(id) => Err(unexpected_outcome::<Category>(id)),
        }
    }

    /// Replace a category and refresh both listings, since transactions show
    /// the name and colour of their category.
    pub async fn update_category(
        &self,
        id: CategoryId,
        data: CategoryData,
    ) -> Result<Category, Error> {
        let outcome = self
            .mutations
            .submit(Mutation::Update(id, data), &self.categories)
            .await?;
        self.refresh_transactions_if_shown().await;

        match outcome {
            MutationOutcome::Created(category) | MutationOutcome::Updated(category) => {
                Ok(category)
            }
            MutationOutcome::Deleted(id) => Err(unexpected_outcome::<Category>(id)),
        }
    }

    /// Delete a category and refresh both listings. The server detaches the
    /// category from its transactions.
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), Error> {
        self.mutations
            .submit(Mutation::Delete(id), &self.categories)
            .await?;
        self.refresh_transactions_if_shown().await;

        Ok(())
    }

    /// The server's income and expense totals.
    pub async fn summary(&self) -> Result<Summary, Error> {
        self.api.summary().await
    }

    /// Compute the budget status of every category from freshly fetched
    /// expenses, optionally only those in the given month.
    ///
    /// Nothing is cached, every call reads the current data from the server.
    pub async fn budget_statuses(
        &self,
        month: Option<(i32, Month)>,
    ) -> Result<Vec<BudgetStatus>, Error> {
        let categories = self.fetch_all::<Category>(&()).await?;
        let expenses = TransactionFilter::any().transaction_type(Some(TransactionType::Expense));
        let mut transactions = self.fetch_all::<Transaction>(&expenses).await?;

        if let Some((year, month)) = month {
            transactions.retain(|transaction| in_month(transaction.date, year, month));
        }

        Ok(compute_budget_status(
            &categories,
            SpendSource::Transactions(&transactions),
        ))
    }

    /// Compute the budget status of every category from the server's summary.
    ///
    /// The summary totals by category name, so if two categories share a name
    /// the spend is summed from the expense transactions instead.
    pub async fn budget_statuses_from_summary(&self) -> Result<Vec<BudgetStatus>, Error> {
        let categories = self.fetch_all::<Category>(&()).await?;

        if has_shared_names(&categories) {
            tracing::info!("category names are not unique, summing transactions instead");
            let expenses =
                TransactionFilter::any().transaction_type(Some(TransactionType::Expense));
            let transactions = self.fetch_all::<Transaction>(&expenses).await?;

            return Ok(compute_budget_status(
                &categories,
                SpendSource::Transactions(&transactions),
            ));
        }

        let summary = self.api.summary().await?;

        Ok(compute_budget_status(
            &categories,
            SpendSource::Summary(&summary),
        ))
    }

    async fn refresh_transactions_if_shown(&self) {
        if self.transactions.state() != ListingState::Idle {
            self.transactions.refresh().await;
        }
    }

    /// Walk every page of `R` matching `filter`.
    ///
    /// Records the server sent back despite the filter, e.g. in a bare array
    /// from a server that ignores the query, are dropped.
    async fn fetch_all<R: Record>(&self, filter: &R::Filter) -> Result<Vec<R>, Error> {
        let mut records = Vec::new();
        let mut page_number = 1;

        loop {
            let page = self
                .api
                .list::<R>(filter, page_number, PageSize::MAX)
                .await?;
            let has_next = page.has_next() && !page.is_empty();
            records.extend(
                page.items
                    .into_iter()
                    .filter(|record| filter.matches(record)),
            );

            if !has_next {
                return Ok(records);
            }

            page_number += 1;
        }
    }
}

fn in_month(date: Date, year: i32, month: Month) -> bool {
    date.year() == year && date.month() == month
}

fn unexpected_outcome<R: Record>(id: DatabaseId) -> Error {
    Error::InvalidResponse(format!(
        "expected the {} #{id} to be saved, but it was deleted",
        R::RESOURCE
    ))
}
