//! Bookkeeping core for a personal Bitcoin wallet.
//!
//! The crate tracks which on-chain addresses and extended-public-key address
//! pools belong to which user-defined account, ingests transaction histories
//! fetched from a remote blockchain indexer, classifies every transaction
//! input and output against the known ownership, and derives per-account
//! balances and human-readable transaction summaries.
//!
//! The main subsystems:
//!
//! - [`ledger`]: value primitives, the ownership registry and its observer
//!   surface, and the transaction store used for balance derivation.
//! - [`classify`]: the pure transaction classification engine and the
//!   "net of change" projection with its presentation helpers.
//! - [`sync`]: the queue-driven, connectivity-aware synchronization
//!   scheduler that keeps address histories current.
//! - [`storage`]: the persistence contract and a file-backed store.
//! - [`indexer`]: the remote fetch contract, the BlockCypher client and the
//!   local response cache.

pub mod classify;
pub mod indexer;
pub mod ledger;
pub mod storage;
pub mod sync;
pub mod utils;
