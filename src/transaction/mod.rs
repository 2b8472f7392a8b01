//! Transaction management for the ledger client.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` record and the `TransactionData` payload for writing one
//! - The `TransactionFilter` used to narrow a transaction listing
//! - The `Summary` aggregate returned by the server

mod core;
mod filter;
mod summary;

pub use core::{Transaction, TransactionData, TransactionType};
pub use filter::TransactionFilter;
pub use summary::{CategoryTotal, Summary};
