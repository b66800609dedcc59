//! Remote indexer integration.
//!
//! This module provides the client and types for pulling per-address
//! transaction histories from the blockchain indexer, together with the
//! best-effort local response cache. The sync scheduler is the only
//! consumer; it talks to the [`TransactionFetch`] trait so tests can swap
//! the network out entirely.

/// Local response cache
mod cache;
/// HTTP client for the indexer's address API
mod client;
/// Wire types and fetch errors
mod types;

pub use cache::{FileTransactionCache, TransactionCache};
pub use client::{BlockCypherClient, TransactionFetch};
pub use types::{FetchError, TxJson, TxInputJson, TxOutputJson};
