//! Pocket Ledger is the client-side state layer of a personal finance tracker.
//!
//! The library talks to a remote ledger API that owns all transactions and
//! categories. It keeps a working copy of one page per listing surface,
//! reconciles that page after every mutation, and derives budget progress for
//! categories with a monthly spending limit.
//!
//! The main entry point is [Ledger], which wires together the [SessionStore],
//! the [HttpLedgerClient], a [ListingEngine] per surface and the
//! [MutationCoordinator].

#![warn(missing_docs)]

mod auth;
mod budget;
mod category;
mod client;
mod config;
mod database_id;
mod db;
mod format;
mod ledger;
mod listing;
mod logging;
mod mutation;
mod pagination;
mod session;
mod suggest;
mod transaction;

#[cfg(test)]
mod test_utils;

use std::collections::BTreeMap;

pub use auth::{LoginCredentials, NewUser, TokenPair, login, logout, register};
pub use budget::{BudgetStatus, SpendSource, compute_budget_status, has_shared_names};
pub use category::{Category, CategoryData, CategoryName, Color, DEFAULT_CATEGORY_COLOR};
pub use client::{HttpLedgerClient, LedgerApi, ListFilter, Record, Resource};
pub use config::LedgerConfig;
pub use database_id::{CategoryId, DatabaseId, TransactionId};
pub use db::initialize as initialize_db;
pub use format::currency;
pub use ledger::Ledger;
pub use listing::{FetchOutcome, ListQuery, ListingEngine, ListingState, MutationEffect};
pub use logging::LOG_BODY_LENGTH_LIMIT;
pub use mutation::{Mutation, MutationCoordinator, MutationOutcome};
pub use pagination::{Page, PageSize, PaginationConfig, total_pages};
pub use session::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SessionStore, SqliteSessionStore};
pub use suggest::CategorySuggester;
pub use transaction::{
    CategoryTotal, Summary, Transaction, TransactionData, TransactionFilter, TransactionType,
};

/// Field-level validation messages keyed by field name, e.g. `"value" -> ["must be positive"]`.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// The errors that may occur in the ledger client.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum Error {
    /// No response was received from the remote ledger, e.g. the host is
    /// unreachable or the request timed out.
    #[error("could not reach the ledger server: {0}")]
    Transport(String),

    /// The remote ledger rejected the request with a 4xx status.
    ///
    /// `body` is the verbatim response body so that validation messages can be
    /// shown next to the offending form fields, see [Error::field_errors].
    #[error("the request was rejected with status {status}: {body}")]
    Client {
        /// The HTTP status code.
        status: u16,
        /// The raw response body.
        body: String,
    },

    /// The remote ledger failed with a 5xx status.
    #[error("the ledger server failed with status {status}")]
    Server {
        /// The HTTP status code.
        status: u16,
    },

    /// Another mutation for the same record is still in flight.
    ///
    /// This is raised locally and never comes from the server. The caller
    /// should wait for the pending mutation to finish before trying again.
    #[error("a change to {resource} #{id} is already in progress")]
    Conflict {
        /// The resource the record belongs to.
        resource: Resource,
        /// The ID of the record.
        id: DatabaseId,
    },

    /// The server responded with a success status but the body could not be
    /// decoded.
    #[error("could not decode the server response: {0}")]
    InvalidResponse(String),

    /// An error occurred while serializing a request payload as JSON.
    #[error("could not serialize as JSON: {0}")]
    JsonSerializationError(String),

    /// The configured API base URL could not be parsed.
    #[error("invalid ledger base URL \"{0}\"")]
    InvalidBaseUrl(String),

    /// An empty string was used to create a category name.
    #[error("Category name cannot be empty")]
    EmptyCategoryName,

    /// A category colour that is not of the form `#RRGGBB`.
    #[error("\"{0}\" is not a valid colour, expected the form #RRGGBB")]
    InvalidColor(String),

    /// An empty string was used as a transaction description.
    #[error("Transaction description cannot be empty")]
    EmptyDescription,

    /// A transaction value of zero or less.
    ///
    /// Transactions store a magnitude, the direction of the money is given by
    /// [TransactionType].
    #[error("{0} is not a valid transaction value, it must be greater than zero")]
    NonPositiveValue(rust_decimal::Decimal),

    /// The password and its confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// A page size outside of the supported set.
    #[error("{0} is not a supported page size, expected one of 10, 20, 50 or 100")]
    InvalidPageSize(u64),

    /// An unhandled/unexpected SQL error in the session store.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(String),

    /// Could not acquire the session database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        tracing::error!("an unhandled SQL error occurred: {}", value);
        Error::SqlError(value.to_string())
    }
}

impl Error {
    /// Whether the failure is transient and the request may be sent again.
    ///
    /// Only transport and server failures are retryable. Client errors need the
    /// user to change the request, and conflicts are resolved by waiting.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Server { .. })
    }

    /// Whether the server refused the request because the bearer token is
    /// missing, expired or invalid.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Client { status: 401 | 403, .. })
    }

    /// Parse the body of a [Error::Client] into per-field messages.
    ///
    /// The body is expected to be a JSON object mapping field names to either
    /// a message or a list of messages. Returns `None` for any other error or
    /// for a body that is not such an object.
    pub fn field_errors(&self) -> Option<FieldErrors> {
        let Error::Client { body, .. } = self else {
            return None;
        };

        let serde_json::Value::Object(fields) = serde_json::from_str(body).ok()? else {
            return None;
        };

        let errors = fields
            .into_iter()
            .map(|(field, messages)| {
                let messages = match messages {
                    serde_json::Value::Array(items) => items
                        .into_iter()
                        .map(|item| match item {
                            serde_json::Value::String(message) => message,
                            other => other.to_string(),
                        })
                        .collect(),
                    serde_json::Value::String(message) => vec![message],
                    other => vec![other.to_string()],
                };

                (field, messages)
            })
            .collect();

        Some(errors)
    }
}
