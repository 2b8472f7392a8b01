//! Runtime configuration for the ledger client.

use std::time::Duration;

use crate::pagination::PaginationConfig;

/// Settings for connecting to the remote ledger and reconciling local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// The base URL of the ledger API, e.g. `http://localhost:8000/api/`.
    pub base_url: String,

    /// How long to wait for a response before treating the request as a
    /// transport failure.
    pub request_timeout: Duration,

    /// How many times a mutation is retried after a transport or server error.
    pub max_retries: u32,

    /// The fixed delay between mutation retries.
    pub retry_backoff: Duration,

    /// How long the category suggester waits for typing to settle.
    pub suggestion_debounce: Duration,

    /// The config that controls how listings are paged.
    pub pagination: PaginationConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/".to_owned(),
            request_timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_backoff: Duration::from_millis(300),
            suggestion_debounce: Duration::from_millis(300),
            pagination: PaginationConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// The default config pointed at `base_url`.
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_owned(),
            ..Default::default()
        }
    }
}
