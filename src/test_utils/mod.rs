#![allow(missing_docs)]

pub(crate) mod http;
pub(crate) mod mock_ledger;

pub(crate) use http::{spawn_api_server, unused_local_url};
pub(crate) use mock_ledger::{MockLedger, Op};
