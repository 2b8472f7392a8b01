//! Serializes create, update and delete requests per record.

use std::{
    collections::HashSet,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use crate::{
    Error,
    client::{LedgerApi, Record, Resource},
    config::LedgerConfig,
    database_id::DatabaseId,
    listing::{ListingEngine, MutationEffect},
};

/// A change to a record of type `R`.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation<R: Record> {
    /// Create a new record.
    Create(R::Payload),
    /// Replace the record with the given ID.
    Update(DatabaseId, R::Payload),
    /// Delete the record with the given ID.
    Delete(DatabaseId),
}

impl<R: Record> Mutation<R> {
    /// The ID of the record being changed, `None` for a record that does not
    /// exist yet.
    pub fn target(&self) -> Option<DatabaseId> {
        match self {
            Mutation::Create(_) => None,
            Mutation::Update(id, _) | Mutation::Delete(id) => Some(*id),
        }
    }
}

/// The server's confirmation of a [Mutation].
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome<R> {
    /// The record as created by the server.
    Created(R),
    /// The record as stored after the update.
    Updated(R),
    /// The ID of the deleted record.
    Deleted(DatabaseId),
}

type InFlight = Mutex<HashSet<(Resource, DatabaseId)>>;

/// Marks a record as having a mutation in flight until dropped.
struct InFlightGuard<'a> {
    in_flight: &'a InFlight,
    key: (Resource, DatabaseId),
}

impl<'a> InFlightGuard<'a> {
    fn acquire(in_flight: &'a InFlight, resource: Resource, id: DatabaseId) -> Result<Self, Error> {
        let key = (resource, id);
        let mut pending = in_flight.lock().unwrap_or_else(PoisonError::into_inner);

        if !pending.insert(key) {
            return Err(Error::Conflict { resource, id });
        }

        Ok(Self { in_flight, key })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Sends mutations to the remote ledger and refreshes the affected listing
/// before reporting success.
pub struct MutationCoordinator<A> {
    api: Arc<A>,
    in_flight: InFlight,
    max_retries: u32,
    retry_backoff: Duration,
}

impl<A: LedgerApi> MutationCoordinator<A> {
    /// Create a coordinator with the retry policy from `config`.
    pub fn new(api: Arc<A>, config: &LedgerConfig) -> Self {
        Self {
            api,
            in_flight: Mutex::new(HashSet::new()),
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
        }
    }

    /// Whether a mutation of the record is currently in flight.
    pub fn is_pending(&self, resource: Resource, id: DatabaseId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(resource, id))
    }

    /// Send `mutation` and, once the server confirms it, refresh `engine`.
    ///
    /// A mutation of a record that already has one in flight fails with
    /// [Error::Conflict] before anything is sent. Transport and server errors
    /// are retried up to the configured number of times with a fixed delay.
    /// Client errors are returned as is. On failure `engine` is left
    /// untouched.
    ///
    /// A failed refresh does not fail the mutation, the engine shows the
    /// failure instead.
    pub async fn submit<R: Record>(
        &self,
        mutation: Mutation<R>,
        engine: &ListingEngine<R, A>,
    ) -> Result<MutationOutcome<R>, Error> {
        let _guard = mutation
            .target()
            .map(|id| InFlightGuard::acquire(&self.in_flight, R::RESOURCE, id))
            .transpose()?;

        let api = &*self.api;
        let (outcome, effect) = match &mutation {
            Mutation::Create(payload) => {
                let record = self.with_retries(move || api.create::<R>(payload)).await?;
                tracing::info!("created {} #{}", R::RESOURCE, record.id());
                (MutationOutcome::Created(record), MutationEffect::Created)
            }
            Mutation::Update(id, payload) => {
                let record = self.with_retries(move || api.update::<R>(*id, payload)).await?;
                tracing::info!("updated {} #{id}", R::RESOURCE);
                (MutationOutcome::Updated(record), MutationEffect::Updated(*id))
            }
            Mutation::Delete(id) => {
                self.with_retries(move || api.delete::<R>(*id)).await?;
                tracing::info!("deleted {} #{id}", R::RESOURCE);
                (MutationOutcome::Deleted(*id), MutationEffect::Deleted(*id))
            }
        };

        engine.after_mutation(effect).await;

        Ok(outcome)
    }

    async fn with_retries<T, F, Fut>(&self, mut send: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let mut retries = 0;

        loop {
            match send().await {
                Err(error) if error.is_retryable() && retries < self.max_retries => {
                    retries += 1;
                    tracing::warn!(
                        "{error}, retrying ({retries} of {}) in {:?}",
                        self.max_retries,
                        self.retry_backoff
                    );
                    tokio::time::sleep(self.retry_backoff).await;
                }
                result => return result,
            }
        }
    }
}
