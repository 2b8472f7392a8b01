//! The typed contract for talking to the remote ledger API.
//!
//! [LedgerApi] is the seam between the ledger state and the network. The
//! production implementation is [HttpLedgerClient]; tests swap in an
//! in-memory ledger.

mod http;

use std::{fmt::Debug, fmt::Display, future::Future};

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    Error,
    database_id::DatabaseId,
    pagination::{Page, PageSize},
    transaction::Summary,
};

pub use http::HttpLedgerClient;

/// The collections exposed by the remote ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    /// Income and expense records.
    Transactions,
    /// Categories with their optional monthly limits.
    Categories,
}

impl Resource {
    /// The URL path segment of the collection, relative to the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Resource::Transactions => "transactions",
            Resource::Categories => "categories",
        }
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Transactions => write!(f, "transaction"),
            Resource::Categories => write!(f, "category"),
        }
    }
}

/// A record type stored by the remote ledger.
pub trait Record:
    Serialize + DeserializeOwned + Debug + Clone + PartialEq + Send + Sync + 'static
{
    /// The collection the record lives in.
    const RESOURCE: Resource;

    /// The body sent to create or replace a record.
    type Payload: Serialize + Debug + Clone + Send + Sync + 'static;

    /// The filter set accepted when listing the collection.
    type Filter: ListFilter<Self>;

    /// The server-assigned ID of the record.
    fn id(&self) -> DatabaseId;
}

/// A filter set for listing records of type `R`.
pub trait ListFilter<R>: Debug + Clone + PartialEq + Default + Send + Sync + 'static {
    /// The query parameters that apply this filter on the server.
    fn query_pairs(&self) -> Vec<(&'static str, String)>;

    /// Whether `record` passes the filter, mirroring the server-side rule.
    ///
    /// Used to drop records a server returned without applying the filter,
    /// and by in-memory implementations of [LedgerApi].
    fn matches(&self, record: &R) -> bool;
}

/// No filtering at all.
impl<R> ListFilter<R> for () {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    fn matches(&self, _: &R) -> bool {
        true
    }
}

/// The operations the remote ledger supports.
///
/// Implementations classify failures into [Error::Transport],
/// [Error::Client] and [Error::Server] and never retry on their own.
pub trait LedgerApi: Send + Sync + 'static {
    /// Get one page of records matching `filter`.
    ///
    /// An empty result is a valid page with no items.
    fn list<R: Record>(
        &self,
        filter: &R::Filter,
        page_number: u64,
        page_size: PageSize,
    ) -> impl Future<Output = Result<Page<R>, Error>> + Send;

    /// Get a single record by ID.
    fn get<R: Record>(&self, id: DatabaseId) -> impl Future<Output = Result<R, Error>> + Send;

    /// Create a record and return it as stored by the server.
    fn create<R: Record>(
        &self,
        payload: &R::Payload,
    ) -> impl Future<Output = Result<R, Error>> + Send;

    /// Replace the record with `id` and return it as stored by the server.
    fn update<R: Record>(
        &self,
        id: DatabaseId,
        payload: &R::Payload,
    ) -> impl Future<Output = Result<R, Error>> + Send;

    /// Delete the record with `id`.
    fn delete<R: Record>(&self, id: DatabaseId) -> impl Future<Output = Result<(), Error>> + Send;

    /// Get the income, expense and per-category totals.
    fn summary(&self) -> impl Future<Output = Result<Summary, Error>> + Send;

    /// Get up to three category names that fit a transaction description.
    fn suggest_categories(
        &self,
        description: &str,
    ) -> impl Future<Output = Result<Vec<String>, Error>> + Send;
}
