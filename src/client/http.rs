//! The [LedgerApi] implementation that talks HTTP to the remote ledger.

use std::sync::Arc;

use reqwest::{Method, StatusCode, Url, header::CONTENT_TYPE};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    Error,
    config::LedgerConfig,
    database_id::DatabaseId,
    logging::{log_request, log_response},
    pagination::{ListResponse, Page, PageSize},
    session::SessionStore,
    transaction::Summary,
};

use super::{LedgerApi, ListFilter, Record};

const SUMMARY_PATH: &str = "transactions/summary/";
const SUGGESTIONS_PATH: &str = "categorias/sugestoes/";

/// A typed wrapper over the ledger's REST API.
///
/// Every request carries `Authorization: Bearer <token>` when the session
/// holds a token. A 401 or 403 response clears the stored token so that the
/// user is asked to log in again.
#[derive(Debug)]
pub struct HttpLedgerClient<S> {
    base_url: Url,
    http: reqwest::Client,
    session: Arc<S>,
}

impl<S: SessionStore> HttpLedgerClient<S> {
    /// Create a client for the API at `config.base_url`.
    ///
    /// # Errors
    /// Returns [Error::InvalidBaseUrl] if the base URL cannot be parsed and
    /// [Error::Transport] if the HTTP client cannot be built.
    pub fn new(config: &LedgerConfig, session: Arc<S>) -> Result<Self, Error> {
        // A trailing slash makes `Url::join` append to the path instead of
        // replacing its last segment.
        let normalized = format!("{}/", config.base_url.trim_end_matches('/'));
        let base_url =
            Url::parse(&normalized).map_err(|_| Error::InvalidBaseUrl(config.base_url.clone()))?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|error| Error::Transport(error.to_string()))?;

        Ok(Self {
            base_url,
            http,
            session,
        })
    }

    /// The session the client reads its bearer token from.
    pub fn session(&self) -> &Arc<S> {
        &self.session
    }

    /// POST `payload` to `path` and decode the response.
    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        let body = to_json(payload)?;
        let text = self.send(Method::POST, url, Some(body)).await?;

        decode(&text)
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path)
            .map_err(|_| Error::InvalidBaseUrl(format!("{}{path}", self.base_url)))
    }

    fn record_url(&self, resource_path: &str, id: Option<DatabaseId>) -> Result<Url, Error> {
        match id {
            Some(id) => self.url(&format!("{resource_path}/{id}/")),
            None => self.url(&format!("{resource_path}/")),
        }
    }

    async fn send(&self, method: Method, url: Url, body: Option<String>) -> Result<String, Error> {
        let token = self.session.get_token().await?;

        let mut request = self.http.request(method.clone(), url.clone());

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let body = body.unwrap_or_default();
        log_request(&method, &url, &body);

        if !body.is_empty() {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = request.send().await.map_err(|error| {
            tracing::warn!("{method} {url} failed before a response arrived: {error}");
            Error::Transport(error.to_string())
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|error| Error::Transport(error.to_string()))?;

        log_response(status, &url, &text);

        let result = classify(status, text);

        if result.as_ref().is_err_and(Error::is_unauthorized) {
            tracing::info!("the server rejected the session, clearing the stored token");

            if let Err(clear_error) = self.session.clear_token().await {
                tracing::error!("could not clear the rejected token: {clear_error}");
            }
        }

        result
    }
}

impl<S: SessionStore> LedgerApi for HttpLedgerClient<S> {
    async fn list<R: Record>(
        &self,
        filter: &R::Filter,
        page_number: u64,
        page_size: PageSize,
    ) -> Result<Page<R>, Error> {
        let mut url = self.record_url(R::RESOURCE.path(), None)?;

        url.query_pairs_mut()
            .append_pair("page", &page_number.to_string())
            .append_pair("page_size", &page_size.to_string())
            .extend_pairs(filter.query_pairs());

        let text = self.send(Method::GET, url, None).await?;
        let response: ListResponse<R> = decode(&text)?;

        Ok(response.into_page(page_number, page_size))
    }

    async fn get<R: Record>(&self, id: DatabaseId) -> Result<R, Error> {
        let url = self.record_url(R::RESOURCE.path(), Some(id))?;
        let text = self.send(Method::GET, url, None).await?;

        decode(&text)
    }

    async fn create<R: Record>(&self, payload: &R::Payload) -> Result<R, Error> {
        let url = self.record_url(R::RESOURCE.path(), None)?;
        let body = to_json(payload)?;
        let text = self.send(Method::POST, url, Some(body)).await?;

        decode(&text)
    }

    async fn update<R: Record>(&self, id: DatabaseId, payload: &R::Payload) -> Result<R, Error> {
        let url = self.record_url(R::RESOURCE.path(), Some(id))?;
        let body = to_json(payload)?;
        let text = self.send(Method::PUT, url, Some(body)).await?;

        decode(&text)
    }

    async fn delete<R: Record>(&self, id: DatabaseId) -> Result<(), Error> {
        let url = self.record_url(R::RESOURCE.path(), Some(id))?;
        self.send(Method::DELETE, url, None).await?;

        Ok(())
    }

    async fn summary(&self) -> Result<Summary, Error> {
        let url = self.url(SUMMARY_PATH)?;
        let text = self.send(Method::GET, url, None).await?;

        decode(&text)
    }

    async fn suggest_categories(&self, description: &str) -> Result<Vec<String>, Error> {
        let mut url = self.url(SUGGESTIONS_PATH)?;
        url.query_pairs_mut().append_pair("q", description);

        let text = self.send(Method::GET, url, None).await?;

        decode(&text)
    }
}

/// Map an HTTP status to success or to the matching error class.
fn classify(status: StatusCode, body: String) -> Result<String, Error> {
    if status.is_success() {
        Ok(body)
    } else if status.is_client_error() {
        Err(Error::Client {
            status: status.as_u16(),
            body,
        })
    } else if status.is_server_error() {
        Err(Error::Server {
            status: status.as_u16(),
        })
    } else {
        Err(Error::InvalidResponse(format!("unexpected status {status}")))
    }
}

fn to_json(payload: &impl Serialize) -> Result<String, Error> {
    serde_json::to_string(payload).map_err(|error| Error::JsonSerializationError(error.to_string()))
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T, Error> {
    serde_json::from_str(text).map_err(|error| {
        tracing::error!("could not decode response body {text:?}: {error}");
        Error::InvalidResponse(error.to_string())
    })
}
