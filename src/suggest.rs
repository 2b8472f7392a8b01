//! Category suggestions for a transaction description as it is typed.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use crate::{Error, client::LedgerApi};

/// Debounces and coalesces suggestion queries.
///
/// Each call waits for the debounce delay first. If another call arrives in
/// the meantime, or while the request is in flight, the older call resolves to
/// `Ok(None)` and only the newest one reaches the caller.
pub struct CategorySuggester<A> {
    api: Arc<A>,
    debounce: Duration,
    latest: AtomicU64,
}

impl<A: LedgerApi> CategorySuggester<A> {
    /// Create a suggester that waits `debounce` for typing to settle.
    pub fn new(api: Arc<A>, debounce: Duration) -> Self {
        Self {
            api,
            debounce,
            latest: AtomicU64::new(0),
        }
    }

    /// Suggest category names for `description`.
    ///
    /// Blank input yields no suggestions without asking the server. Returns
    /// `Ok(None)` if a newer call superseded this one, even if this call's
    /// request failed.
    pub async fn suggest(&self, description: &str) -> Result<Option<Vec<String>>, Error> {
        let token = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let description = description.trim();

        if description.is_empty() {
            return Ok(Some(Vec::new()));
        }

        tokio::time::sleep(self.debounce).await;

        if !self.is_latest(token) {
            return Ok(None);
        }

        let result = self.api.suggest_categories(description).await;

        if !self.is_latest(token) {
            tracing::debug!("discarding suggestions for \"{description}\"");
            return Ok(None);
        }

        result.map(Some)
    }

    /// Drop any pending query, e.g. when the form is closed.
    pub fn cancel(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }

    fn is_latest(&self, token: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == token
    }
}
