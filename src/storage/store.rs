use async_trait::async_trait;

use crate::ledger::{Account, AccountId, BitcoinAddress, Xpub};

/// Persistence failure. The registry treats this as fatal to the enclosing
/// operation: the mutation is aborted, never partially applied.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt store: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Which row an address belongs to.
#[derive(Debug, Clone, Copy)]
pub enum AddressOwner<'a> {
    Account(&'a AccountId),
    Pool(&'a Xpub),
}

/// Durable storage contract consumed by the ownership registry.
///
/// Accounts come back bare; their owned addresses and key pools are loaded
/// through the per-account queries and replayed by the registry.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn get_accounts(&self) -> Result<Vec<Account>, StorageError>;

    async fn get_addresses(&self, account: &AccountId) -> Result<Vec<BitcoinAddress>, StorageError>;

    async fn get_key_pools(&self, account: &AccountId) -> Result<Vec<Xpub>, StorageError>;

    async fn get_pool_addresses(&self, xpub: &Xpub) -> Result<Vec<BitcoinAddress>, StorageError>;

    async fn insert_account(&self, account: &Account) -> Result<(), StorageError>;

    async fn insert_key_pool(&self, xpub: &Xpub, account: &AccountId) -> Result<(), StorageError>;

    async fn insert_address(
        &self,
        address: &BitcoinAddress,
        owner: AddressOwner<'_>,
    ) -> Result<(), StorageError>;

    async fn update_address_timestamp(&self, address: &BitcoinAddress) -> Result<(), StorageError>;
}
