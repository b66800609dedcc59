use async_trait::async_trait;
use std::sync::Mutex;

use super::store::{AddressOwner, StorageError, WalletStore};
use crate::ledger::{Account, AccountId, BitcoinAddress, Xpub};

#[derive(Debug, Clone)]
enum Owner {
    Account(AccountId),
    Pool(Xpub),
}

#[derive(Default)]
struct MemoryState {
    accounts: Vec<Account>,
    pools: Vec<(Xpub, AccountId)>,
    addresses: Vec<(BitcoinAddress, Owner)>,
}

/// Ephemeral wallet store. Holds the same relational shape as the file
/// store, but in memory only; useful for tests and throwaway runs.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn get_accounts(&self) -> Result<Vec<Account>, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .accounts
            .iter()
            .map(|a| Account::with_id(a.id(), a.name(), a.created_at()))
            .collect())
    }

    async fn get_addresses(
        &self,
        account: &AccountId,
    ) -> Result<Vec<BitcoinAddress>, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .addresses
            .iter()
            .filter(|(_, owner)| matches!(owner, Owner::Account(id) if id == account))
            .map(|(address, _)| address.clone())
            .collect())
    }

    async fn get_key_pools(&self, account: &AccountId) -> Result<Vec<Xpub>, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .pools
            .iter()
            .filter(|(_, id)| id == account)
            .map(|(xpub, _)| xpub.clone())
            .collect())
    }

    async fn get_pool_addresses(&self, xpub: &Xpub) -> Result<Vec<BitcoinAddress>, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .addresses
            .iter()
            .filter(|(_, owner)| matches!(owner, Owner::Pool(x) if x == xpub))
            .map(|(address, _)| address.clone())
            .collect())
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        state
            .accounts
            .push(Account::with_id(account.id(), account.name(), account.created_at()));
        Ok(())
    }

    async fn insert_key_pool(&self, xpub: &Xpub, account: &AccountId) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        state.pools.push((xpub.clone(), *account));
        Ok(())
    }

    async fn insert_address(
        &self,
        address: &BitcoinAddress,
        owner: AddressOwner<'_>,
    ) -> Result<(), StorageError> {
        let owner = match owner {
            AddressOwner::Account(id) => Owner::Account(*id),
            AddressOwner::Pool(xpub) => Owner::Pool(xpub.clone()),
        };
        let mut state = self.state.lock().unwrap();
        state.addresses.push((address.clone(), owner));
        Ok(())
    }

    async fn update_address_timestamp(
        &self,
        address: &BitcoinAddress,
    ) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        for (stored, _) in &mut state.addresses {
            if stored.value == address.value {
                stored.last_update = address.last_update;
            }
        }
        Ok(())
    }
}
