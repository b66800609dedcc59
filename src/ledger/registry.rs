//! The ownership registry.
//!
//! `AccountRegistry` is the explicitly constructed, injectable catalog of
//! accounts and their owned addresses / key pools. It persists through a
//! [`WalletStore`], emits a pool-rebuild signal on membership changes, and
//! owns two notification channels: per-account ownership events and a
//! registry-wide address-update broadcast driven by the sync scheduler.
//!
//! Every mutation is all-or-nothing: persistence completes before the
//! in-memory state becomes visible to other readers. Notification delivery
//! happens after the state lock is released.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::account::{Account, AccountId, KeyPool, OwnedAddress};
use super::address::BitcoinAddress;
use super::types::{RegistryError, SubscriberId};
use crate::storage::{AddressOwner, WalletStore};

/// Observer of one account's ownership changes.
pub trait AccountObserver: Send + Sync {
    fn address_added(&self, account: &Account, address: &OwnedAddress);
    fn xpub_added(&self, account: &Account, pool: &KeyPool);
}

/// Registry-wide observer of address balance/timestamp updates.
pub trait AddressObserver: Send + Sync {
    fn address_updated(&self, address: &BitcoinAddress);
}

struct RegistryState {
    accounts: Vec<Account>,
    account_observers: HashMap<AccountId, Vec<(SubscriberId, Arc<dyn AccountObserver>)>>,
    address_observers: Vec<(SubscriberId, Arc<dyn AddressObserver>)>,
    rebuild_signals: Vec<mpsc::UnboundedSender<AccountId>>,
    next_subscriber: u64,
}

/// In-memory catalog of accounts and everything they own.
pub struct AccountRegistry {
    store: Arc<dyn WalletStore>,
    state: Mutex<RegistryState>,
}

impl AccountRegistry {
    pub fn new(store: Arc<dyn WalletStore>) -> Self {
        Self {
            store,
            state: Mutex::new(RegistryState {
                accounts: Vec::new(),
                account_observers: HashMap::new(),
                address_observers: Vec::new(),
                rebuild_signals: Vec::new(),
                next_subscriber: 0,
            }),
        }
    }

    /// Load every account, owned address and key pool from the backing
    /// store, replaying the add logic with persistence disabled.
    ///
    /// A load failure clears the registry and propagates: partial data is
    /// never observable as complete.
    pub async fn initialize(&self) -> Result<(), RegistryError> {
        let accounts = self.store.get_accounts().await?;
        info!("loaded {} accounts from storage", accounts.len());
        {
            let mut state = self.state.lock().unwrap();
            state.accounts = accounts.clone();
        }
        if let Err(err) = self.replay(&accounts).await {
            let mut state = self.state.lock().unwrap();
            state.accounts.clear();
            return Err(err);
        }
        Ok(())
    }

    async fn replay(&self, accounts: &[Account]) -> Result<(), RegistryError> {
        for account in accounts {
            for address in self.store.get_addresses(&account.id()).await? {
                self.add_address_with(account.id(), OwnedAddress::new(address), false)
                    .await?;
            }
            for xpub in self.store.get_key_pools(&account.id()).await? {
                let addresses = self.store.get_pool_addresses(&xpub).await?;
                self.add_xpub_with(account.id(), KeyPool::new(xpub, addresses), false)
                    .await?;
            }
        }
        Ok(())
    }

    /// Register a new account. Idempotent by id: a second add of the same
    /// id is a no-op, not an error.
    pub async fn add_account(&self, account: Account) -> Result<(), RegistryError> {
        {
            let state = self.state.lock().unwrap();
            if state.accounts.iter().any(|a| a.id() == account.id()) {
                return Ok(());
            }
        }
        self.store.insert_account(&account).await?;
        let mut state = self.state.lock().unwrap();
        if !state.accounts.iter().any(|a| a.id() == account.id()) {
            info!("registered account {} ({})", account.name(), account.id());
            state.accounts.push(account);
        }
        Ok(())
    }

    /// Register an address under an account, persist it, emit the
    /// pool-rebuild signal and notify the account's subscribers.
    pub async fn add_address(
        &self,
        account_id: AccountId,
        address: OwnedAddress,
    ) -> Result<(), RegistryError> {
        self.add_address_with(account_id, address, true).await
    }

    async fn add_address_with(
        &self,
        account_id: AccountId,
        address: OwnedAddress,
        persist: bool,
    ) -> Result<(), RegistryError> {
        {
            // Reject before persisting so a duplicate leaves no trace.
            let state = self.state.lock().unwrap();
            let account = state
                .accounts
                .iter()
                .find(|a| a.id() == account_id)
                .ok_or(RegistryError::UnknownAccount)?;
            if account
                .addresses()
                .iter()
                .any(|a| a.address().value == address.address().value)
            {
                return Err(RegistryError::AddressAlreadyOwned);
            }
        }
        if persist {
            self.store
                .insert_address(address.address(), AddressOwner::Account(&account_id))
                .await?;
        }
        let (snapshot, observers) = {
            let mut state = self.state.lock().unwrap();
            let account = state
                .accounts
                .iter_mut()
                .find(|a| a.id() == account_id)
                .ok_or(RegistryError::UnknownAccount)?;
            account.insert_address(address.clone())?;
            let snapshot = account.clone();
            state.rebuild_signals.retain(|s| s.send(account_id).is_ok());
            (snapshot, Self::observers_for(&state, account_id))
        };
        debug!(
            "address {} ({:?}) added to account {}",
            address.address().value,
            address.address().kind(),
            account_id
        );
        for observer in observers {
            observer.address_added(&snapshot, &address);
        }
        Ok(())
    }

    /// Register a key pool under an account. Same persistence, rebuild and
    /// notification behavior as [`add_address`](Self::add_address).
    pub async fn add_xpub(&self, account_id: AccountId, pool: KeyPool) -> Result<(), RegistryError> {
        self.add_xpub_with(account_id, pool, true).await
    }

    async fn add_xpub_with(
        &self,
        account_id: AccountId,
        pool: KeyPool,
        persist: bool,
    ) -> Result<(), RegistryError> {
        {
            let state = self.state.lock().unwrap();
            let account = state
                .accounts
                .iter()
                .find(|a| a.id() == account_id)
                .ok_or(RegistryError::UnknownAccount)?;
            if account.pools().contains(&pool) {
                return Err(RegistryError::XpubAlreadyOwned);
            }
        }
        if persist {
            self.store.insert_key_pool(pool.xpub(), &account_id).await?;
            for address in pool.addresses() {
                self.store
                    .insert_address(address, AddressOwner::Pool(pool.xpub()))
                    .await?;
            }
        }
        let (snapshot, observers) = {
            let mut state = self.state.lock().unwrap();
            let account = state
                .accounts
                .iter_mut()
                .find(|a| a.id() == account_id)
                .ok_or(RegistryError::UnknownAccount)?;
            account.insert_pool(pool.clone())?;
            let snapshot = account.clone();
            state.rebuild_signals.retain(|s| s.send(account_id).is_ok());
            (snapshot, Self::observers_for(&state, account_id))
        };
        debug!("xpub {} added to account {}", pool.xpub(), account_id);
        for observer in observers {
            observer.xpub_added(&snapshot, &pool);
        }
        Ok(())
    }

    fn observers_for(
        state: &RegistryState,
        account_id: AccountId,
    ) -> Vec<Arc<dyn AccountObserver>> {
        state
            .account_observers
            .get(&account_id)
            .map(|observers| observers.iter().map(|(_, o)| o.clone()).collect())
            .unwrap_or_default()
    }

    /// Ordered snapshot of the registered accounts. Later mutations are not
    /// observable through a returned snapshot.
    pub fn accounts(&self) -> Vec<Account> {
        self.state.lock().unwrap().accounts.clone()
    }

    pub fn account(&self, id: AccountId) -> Option<Account> {
        self.state
            .lock()
            .unwrap()
            .accounts
            .iter()
            .find(|a| a.id() == id)
            .cloned()
    }

    /// Subscribe to one account's ownership-change events. Observers are
    /// notified in registration order.
    pub fn subscribe_account(
        &self,
        observer: Arc<dyn AccountObserver>,
        account_id: AccountId,
    ) -> SubscriberId {
        let mut state = self.state.lock().unwrap();
        let id = SubscriberId(state.next_subscriber);
        state.next_subscriber += 1;
        state
            .account_observers
            .entry(account_id)
            .or_default()
            .push((id, observer));
        id
    }

    /// Remove a subscription from every account's observer list.
    pub fn unsubscribe_account(&self, id: SubscriberId) {
        let mut state = self.state.lock().unwrap();
        for observers in state.account_observers.values_mut() {
            observers.retain(|(sid, _)| *sid != id);
        }
    }

    /// Subscribe to the registry-wide address-update broadcast.
    pub fn subscribe_addresses(&self, observer: Arc<dyn AddressObserver>) -> SubscriberId {
        let mut state = self.state.lock().unwrap();
        let id = SubscriberId(state.next_subscriber);
        state.next_subscriber += 1;
        state.address_observers.push((id, observer));
        id
    }

    pub fn unsubscribe_addresses(&self, id: SubscriberId) {
        let mut state = self.state.lock().unwrap();
        state.address_observers.retain(|(sid, _)| *sid != id);
    }

    /// Broadcast an address update to the registry-wide channel. The sync
    /// scheduler drives this after each successful fetch.
    pub fn broadcast_address_update(&self, address: &BitcoinAddress) {
        let observers: Vec<Arc<dyn AddressObserver>> = {
            let state = self.state.lock().unwrap();
            state
                .address_observers
                .iter()
                .map(|(_, o)| o.clone())
                .collect()
        };
        for observer in observers {
            observer.address_updated(address);
        }
    }

    /// Record a successful fetch time on whichever account owns the address
    /// value, returning the stamped address.
    pub fn stamp_address(&self, value: &str, timestamp: i64) -> Option<BitcoinAddress> {
        let mut state = self.state.lock().unwrap();
        for account in &mut state.accounts {
            if let Some(address) = account.stamp_address(value, timestamp) {
                return Some(address);
            }
        }
        None
    }

    /// New receiver for the pool-rebuild signal emitted on every address or
    /// xpub registration. The sync scheduler consumes this to re-queue the
    /// affected account's addresses.
    pub fn rebuild_signal(&self) -> mpsc::UnboundedReceiver<AccountId> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().unwrap().rebuild_signals.push(tx);
        rx
    }
}
