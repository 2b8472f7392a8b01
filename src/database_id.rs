//! ID types for records owned by the remote ledger.

/// Alias for the integer type the server uses for record IDs.
pub type DatabaseId = i64;

/// The server-assigned ID of a transaction.
pub type TransactionId = DatabaseId;

/// The server-assigned ID of a category.
pub type CategoryId = DatabaseId;
