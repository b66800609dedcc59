//! Persistence for the ownership registry.
//!
//! The registry only ever talks to the [`WalletStore`] trait; any I/O
//! failure is a [`StorageError`] and aborts the enclosing mutation. Two
//! implementations ship with the crate: a JSON-document [`FileStore`] for
//! the service binary, and an ephemeral [`MemoryStore`] for tests and
//! tooling.

/// File-backed wallet store
mod file;
/// In-memory wallet store
mod memory;
/// Persistence contract and error type
mod store;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::{AddressOwner, StorageError, WalletStore};
