//! Ownership ledger: accounts, owned addresses, key pools and the registry
//! that keeps them consistent.
//!
//! This module is the in-memory source of truth for "what do we own". It is
//! composed of:
//!
//! - `amount`: integer satoshi arithmetic.
//! - `address`: on-chain address values and their textual form.
//! - `account`: accounts and their owned address / key-pool membership.
//! - `registry`: the mutable catalog of accounts, its persistence wiring and
//!   its two notification channels.
//! - `tx`: raw transaction data as reported by the indexer.
//! - `txstore`: the ingestion log, de-duplicated by txid, from which
//!   balances are derived.

/// Owned account model and membership rules
pub mod account;
/// Bitcoin address values and form detection
pub mod address;
/// Satoshi amounts
pub mod amount;
/// The ownership registry and observer surface
pub mod registry;
/// Raw transaction model
pub mod tx;
/// Transaction ingestion log and balance derivation
pub mod txstore;
/// Shared error and subscription types
pub mod types;

pub use account::{Account, AccountId, KeyPool, OwnedAddress, Xpub};
pub use address::{AddressKind, BitcoinAddress};
pub use amount::Satoshis;
pub use registry::{AccountObserver, AccountRegistry, AddressObserver};
pub use tx::{BitcoinTx, TxInput, TxOutput};
pub use txstore::{TransactionObserver, TransactionStore};
pub use types::{RegistryError, SubscriberId};
