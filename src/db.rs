//! Sets up the local SQLite database that persists the session.

use rusqlite::Connection;

use crate::session::create_session_table;

/// Create the tables used by the client.
///
/// Safe to call on an existing database, tables that already exist are left
/// untouched.
///
/// # Errors
/// Returns an error if a table cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    create_session_table(connection)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn initialize_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).expect("first initialization failed");
        initialize(&connection).expect("second initialization failed");
    }
}
