//! Persists the bearer token that authenticates requests to the remote ledger.
//!
//! The token is opaque to the client. It is written at login, read before
//! every request and cleared at logout or when the server rejects it. There is
//! no refresh: an expired token surfaces as a failed request and the user has
//! to log in again.

use std::{
    future::Future,
    path::Path,
    sync::{Arc, Mutex},
};

use rusqlite::{Connection, OptionalExtension};

use crate::{Error, db::initialize};

/// The key of the access (bearer) token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// The key of the refresh token issued alongside the access token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Read/write access to the persisted session.
///
/// Every method is a suspension point so that implementations may do I/O.
pub trait SessionStore: Send + Sync + 'static {
    /// The current bearer token, if any.
    fn get_token(&self) -> impl Future<Output = Result<Option<String>, Error>> + Send;

    /// Store `token`, replacing any previous token.
    fn set_token(&self, token: &str) -> impl Future<Output = Result<(), Error>> + Send;

    /// Remove the stored tokens.
    fn clear_token(&self) -> impl Future<Output = Result<(), Error>> + Send;

    /// The refresh token stored at login, if any.
    fn get_refresh_token(&self) -> impl Future<Output = Result<Option<String>, Error>> + Send;

    /// Store the token pair issued at login, replacing any previous pair.
    fn set_session(
        &self,
        access: &str,
        refresh: &str,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}

/// A [SessionStore] backed by a key-value table in SQLite.
#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    /// Wrap an open connection, creating the session table if needed.
    ///
    /// # Errors
    /// Returns an error if the table cannot be created.
    pub fn new(connection: Connection) -> Result<Self, Error> {
        initialize(&connection)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Open (or create) the session database at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let connection = Connection::open(path)?;

        Self::new(connection)
    }

    /// A store that lives only as long as the process.
    ///
    /// # Errors
    /// Returns an error if SQLite cannot create the in-memory database.
    pub fn in_memory() -> Result<Self, Error> {
        Self::new(Connection::open_in_memory()?)
    }

    fn get_value(&self, key: &str) -> Result<Option<String>, Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        connection
            .query_row("SELECT value FROM session WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(Error::from)
    }

    fn set_values(&self, values: &[(&str, &str)]) -> Result<(), Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        let transaction = connection.unchecked_transaction()?;

        for (key, value) in values {
            transaction.execute(
                "INSERT INTO session (key, value) VALUES (?1, ?2)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                (key, value),
            )?;
        }

        transaction.commit()?;
        Ok(())
    }

    fn remove_values(&self, keys: &[&str]) -> Result<(), Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        for key in keys {
            connection.execute("DELETE FROM session WHERE key = ?1", [key])?;
        }

        Ok(())
    }
}

impl SessionStore for SqliteSessionStore {
    async fn get_token(&self) -> Result<Option<String>, Error> {
        self.get_value(ACCESS_TOKEN_KEY)
    }

    async fn set_token(&self, token: &str) -> Result<(), Error> {
        self.set_values(&[(ACCESS_TOKEN_KEY, token)])
    }

    async fn clear_token(&self) -> Result<(), Error> {
        tracing::debug!("clearing stored session tokens");
        self.remove_values(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY])
    }

    async fn get_refresh_token(&self) -> Result<Option<String>, Error> {
        self.get_value(REFRESH_TOKEN_KEY)
    }

    async fn set_session(&self, access: &str, refresh: &str) -> Result<(), Error> {
        self.set_values(&[(ACCESS_TOKEN_KEY, access), (REFRESH_TOKEN_KEY, refresh)])
    }
}

/// Create the key-value table that holds the session.
pub(crate) fn create_session_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS session (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}
