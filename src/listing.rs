//! The paginated query engine behind each listing surface.
//!
//! A [ListingEngine] owns the page number, page size and filter of one
//! surface and the last page fetched for them. Every change issues exactly one
//! list call. Each call is tagged with a monotonically increasing request
//! token and its response is only applied if no newer call was issued in the
//! meantime, so a slow response can never overwrite a newer one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    Error,
    client::{LedgerApi, Record},
    database_id::DatabaseId,
    pagination::{Page, PageSize, PaginationConfig},
};

/// The most list calls a single fetch may make while clamping the page number.
const MAX_FETCH_ATTEMPTS: u32 = 3;

/// The parameters of one list call.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery<F> {
    /// The 1-based page number.
    pub page_number: u64,
    /// The number of items per page.
    pub page_size: PageSize,
    /// The filters to apply.
    pub filter: F,
}

/// What a listing surface is currently showing.
#[derive(Debug, Clone, PartialEq)]
pub enum ListingState<R: Record> {
    /// Nothing has been requested yet, or the surface was suspended.
    Idle,
    /// A list call is in flight.
    Loading {
        /// The query being fetched.
        query: ListQuery<R::Filter>,
        /// The page that was visible before, kept so it can stay on screen.
        previous: Option<Page<R>>,
    },
    /// The last list call succeeded.
    Ready {
        /// The query that produced `page`.
        query: ListQuery<R::Filter>,
        /// The fetched page.
        page: Page<R>,
    },
    /// The last list call failed.
    Failed {
        /// The exact query that failed, see [ListingEngine::retry].
        query: ListQuery<R::Filter>,
        /// Why it failed.
        error: Error,
    },
}

impl<R: Record> ListingState<R> {
    /// The page that should be on screen, if any.
    ///
    /// While loading this is the previously fetched page.
    pub fn visible_page(&self) -> Option<&Page<R>> {
        match self {
            ListingState::Ready { page, .. } => Some(page),
            ListingState::Loading { previous, .. } => previous.as_ref(),
            ListingState::Idle | ListingState::Failed { .. } => None,
        }
    }

    /// Whether a list call is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, ListingState::Loading { .. })
    }
}

/// Whether the response to a fetch was applied to the visible state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response, success or failure, is now the visible state.
    Applied,
    /// A newer fetch was issued, or the surface was suspended, before the
    /// response arrived. The response was discarded.
    Superseded,
}

/// A confirmed change to a record of the surface's resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationEffect {
    /// A record was created.
    Created,
    /// The record with this ID was updated.
    Updated(DatabaseId),
    /// The record with this ID was deleted.
    Deleted(DatabaseId),
}

struct EngineInner<R: Record> {
    query: ListQuery<R::Filter>,
    state: ListingState<R>,
    latest_token: u64,
}

impl<R: Record> EngineInner<R> {
    /// Move to `Loading` for `query` and claim a new request token.
    fn start(&mut self, query: ListQuery<R::Filter>) -> u64 {
        self.latest_token += 1;
        self.load(query);
        self.latest_token
    }

    /// Move to `Loading` for `query` under the current request token.
    fn load(&mut self, query: ListQuery<R::Filter>) {
        let previous = match std::mem::replace(&mut self.state, ListingState::Idle) {
            ListingState::Ready { page, .. } => Some(page),
            ListingState::Loading { previous, .. } => previous,
            ListingState::Idle | ListingState::Failed { .. } => None,
        };

        self.query = query.clone();
        self.state = ListingState::Loading { query, previous };
    }

    fn settle(&mut self, query: ListQuery<R::Filter>, result: Result<Page<R>, Error>) {
        self.query = query.clone();
        self.state = match result {
            Ok(page) => ListingState::Ready { query, page },
            Err(error) => {
                tracing::warn!(
                    "could not list {}s on page {}: {error}",
                    R::RESOURCE,
                    query.page_number
                );
                ListingState::Failed { query, error }
            }
        };
    }
}

/// The paginated, filtered view of one resource.
pub struct ListingEngine<R: Record, A> {
    api: Arc<A>,
    inner: Mutex<EngineInner<R>>,
}

impl<R: Record, A: LedgerApi> ListingEngine<R, A> {
    /// Create an idle engine starting from the configured page and page size
    /// with no filters.
    pub fn new(api: Arc<A>, config: &PaginationConfig) -> Self {
        Self {
            api,
            inner: Mutex::new(EngineInner {
                query: ListQuery {
                    page_number: config.default_page.max(1),
                    page_size: config.default_page_size,
                    filter: R::Filter::default(),
                },
                state: ListingState::Idle,
                latest_token: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineInner<R>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The query the surface is currently set to.
    pub fn query(&self) -> ListQuery<R::Filter> {
        self.lock().query.clone()
    }

    /// A snapshot of the surface's state.
    pub fn state(&self) -> ListingState<R> {
        self.lock().state.clone()
    }

    /// The last successfully fetched page, if the surface is ready.
    pub fn page(&self) -> Option<Page<R>> {
        match &self.lock().state {
            ListingState::Ready { page, .. } => Some(page.clone()),
            _ => None,
        }
    }

    /// Fetch the current query again.
    pub async fn refresh(&self) -> FetchOutcome {
        let query = self.query();
        self.fetch(query).await
    }

    /// Go to `page_number`, clamped into `[1, total_pages]` of the last
    /// known result set.
    pub async fn set_page(&self, page_number: u64) -> FetchOutcome {
        let query = {
            let inner = self.lock();
            let last_page = inner
                .state
                .visible_page()
                .map(Page::total_pages)
                .unwrap_or(u64::MAX);

            ListQuery {
                page_number: page_number.clamp(1, last_page.max(1)),
                ..inner.query.clone()
            }
        };

        self.fetch(query).await
    }

    /// Go to the next page. Returns `None` without fetching when the visible
    /// page is the last one.
    pub async fn next_page(&self) -> Option<FetchOutcome> {
        let page_number = {
            let inner = self.lock();
            let page = inner.state.visible_page()?;

            if !page.has_next() {
                return None;
            }

            page.page_number + 1
        };

        Some(self.set_page(page_number).await)
    }

    /// Go to the previous page. Returns `None` without fetching on page 1.
    pub async fn previous_page(&self) -> Option<FetchOutcome> {
        let page_number = self.query().page_number;

        if page_number <= 1 {
            return None;
        }

        Some(self.set_page(page_number - 1).await)
    }

    /// Change the page size and go back to page 1.
    pub async fn set_page_size(&self, page_size: PageSize) -> FetchOutcome {
        let query = ListQuery {
            page_number: 1,
            page_size,
            ..self.query()
        };

        self.fetch(query).await
    }

    /// Replace the filters and go back to page 1.
    pub async fn set_filter(&self, filter: R::Filter) -> FetchOutcome {
        let query = ListQuery {
            page_number: 1,
            filter,
            ..self.query()
        };

        self.fetch(query).await
    }

    /// Replace the whole query at once, with a single list call. A page number
    /// past the end is clamped once the server reports the page count.
    pub async fn open(&self, query: ListQuery<R::Filter>) -> FetchOutcome {
        let query = ListQuery {
            page_number: query.page_number.max(1),
            ..query
        };

        self.fetch(query).await
    }

    /// Fetch the query that failed last, or the current query if nothing failed.
    pub async fn retry(&self) -> FetchOutcome {
        let query = {
            let inner = self.lock();
            match &inner.state {
                ListingState::Failed { query, .. } => query.clone(),
                _ => inner.query.clone(),
            }
        };

        self.fetch(query).await
    }

    /// Leave the surface: any response still in flight is discarded when it
    /// arrives. A visible page or failure stays as it is.
    pub fn suspend(&self) {
        let mut inner = self.lock();
        inner.latest_token += 1;

        if inner.state.is_loading() {
            inner.state = ListingState::Idle;
        }
    }

    /// Refresh the current page after a confirmed mutation.
    ///
    /// Deleting the only item on a page past the first moves back one page
    /// so that an empty trailing page is never shown.
    pub async fn after_mutation(&self, effect: MutationEffect) -> FetchOutcome {
        let query = {
            let inner = self.lock();
            let mut query = inner.query.clone();

            if let (MutationEffect::Deleted(id), Some(page)) = (effect, inner.state.visible_page())
            {
                let only_item = page.items.len() == 1 && page.items[0].id() == id;

                if only_item && page.page_number > 1 {
                    query.page_number = page.page_number - 1;
                }
            }

            query
        };

        self.fetch(query).await
    }

    /// Issue the list call for `query`, clamping the page number into the
    /// range the server reports.
    async fn fetch(&self, mut query: ListQuery<R::Filter>) -> FetchOutcome {
        let requested_page = query.page_number;
        let token = self.lock().start(query.clone());
        let mut attempt = 1;

        loop {
            let result = self
                .api
                .list::<R>(&query.filter, query.page_number, query.page_size)
                .await;

            let mut inner = self.lock();

            if inner.latest_token != token {
                tracing::debug!(
                    "discarding stale {} page {} (request {token})",
                    R::RESOURCE,
                    query.page_number
                );
                return FetchOutcome::Superseded;
            }

            let clamped_page = match &result {
                _ if attempt >= MAX_FETCH_ATTEMPTS => None,
                Err(error) if query.page_number > 1 && is_invalid_page(error) => Some(1),
                Ok(page) => Some(requested_page.min(page.total_pages()))
                    .filter(|wanted| *wanted != query.page_number),
                Err(_) => None,
            };

            match clamped_page {
                Some(page_number) => {
                    tracing::debug!(
                        "{} page {} is out of range, fetching page {page_number}",
                        R::RESOURCE,
                        query.page_number
                    );
                    query.page_number = page_number;
                    inner.load(query.clone());
                    attempt += 1;
                }
                None => {
                    inner.settle(query, result);
                    return FetchOutcome::Applied;
                }
            }
        }
    }
}

/// The server answers a page number past the end with 404.
fn is_invalid_page(error: &Error) -> bool {
    matches!(error, Error::Client { status: 404, .. })
}
