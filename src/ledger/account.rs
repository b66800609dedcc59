use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

use super::address::BitcoinAddress;
use super::types::RegistryError;

/// Opaque account identifier, generated at account creation and stable for
/// the account's lifetime.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl AccountId {
    /// Fresh random identifier for a newly created account.
    pub fn generate() -> Self {
        Self(rand::rng().random_range(0..i64::MAX))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An extended public key, treated as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Xpub(pub String);

impl Xpub {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Xpub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An address explicitly registered under one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedAddress {
    address: BitcoinAddress,
}

impl OwnedAddress {
    pub fn new(address: BitcoinAddress) -> Self {
        Self { address }
    }

    pub fn address(&self) -> &BitcoinAddress {
        &self.address
    }
}

/// An extended public key together with the addresses it derives.
///
/// Derivation mechanics are external; the pool carries a pre-expanded,
/// possibly-growing address sequence. Pool identity is the extended key.
#[derive(Debug, Clone)]
pub struct KeyPool {
    xpub: Xpub,
    addresses: Vec<BitcoinAddress>,
}

impl KeyPool {
    pub fn new(xpub: Xpub, addresses: Vec<BitcoinAddress>) -> Self {
        Self { xpub, addresses }
    }

    pub fn xpub(&self) -> &Xpub {
        &self.xpub
    }

    pub fn addresses(&self) -> &[BitcoinAddress] {
        &self.addresses
    }
}

impl PartialEq for KeyPool {
    fn eq(&self, other: &Self) -> bool {
        self.xpub == other.xpub
    }
}

impl Eq for KeyPool {}

/// A user-defined account owning addresses and key pools.
///
/// Equality and hashing are by id only. Membership is append-only; this
/// design has no remove operation.
#[derive(Debug, Clone)]
pub struct Account {
    id: AccountId,
    name: String,
    created_at: i64,
    addresses: Vec<OwnedAddress>,
    pools: Vec<KeyPool>,
}

impl Account {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(AccountId::generate(), name, Utc::now().timestamp())
    }

    pub fn with_id(id: AccountId, name: impl Into<String>, created_at: i64) -> Self {
        Self {
            id,
            name: name.into(),
            created_at,
            addresses: Vec::new(),
            pools: Vec::new(),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn addresses(&self) -> &[OwnedAddress] {
        &self.addresses
    }

    pub fn pools(&self) -> &[KeyPool] {
        &self.pools
    }

    /// Every address the account controls: explicitly owned ones followed by
    /// each pool's derived addresses, in registration order.
    pub fn all_addresses(&self) -> Vec<BitcoinAddress> {
        let mut res: Vec<BitcoinAddress> = self
            .addresses
            .iter()
            .map(|a| a.address().clone())
            .collect();
        for pool in &self.pools {
            res.extend_from_slice(pool.addresses());
        }
        res
    }

    pub fn owns_address(&self, value: &str) -> bool {
        self.addresses.iter().any(|a| a.address().value == value)
            || self
                .pools
                .iter()
                .any(|p| p.addresses().iter().any(|a| a.value == value))
    }

    /// Oldest successful-fetch timestamp across the account's addresses, or
    /// `None` while any address has never been synchronized.
    pub fn last_synchronized(&self) -> Option<i64> {
        let mut oldest: Option<i64> = None;
        for address in self.all_addresses() {
            match address.last_update {
                Some(ts) => {
                    oldest = Some(oldest.map_or(ts, |cur: i64| cur.min(ts)));
                }
                None => return None,
            }
        }
        oldest
    }

    pub(crate) fn insert_address(&mut self, owned: OwnedAddress) -> Result<(), RegistryError> {
        if self
            .addresses
            .iter()
            .any(|a| a.address().value == owned.address().value)
        {
            return Err(RegistryError::AddressAlreadyOwned);
        }
        self.addresses.push(owned);
        Ok(())
    }

    pub(crate) fn insert_pool(&mut self, pool: KeyPool) -> Result<(), RegistryError> {
        if self.pools.contains(&pool) {
            return Err(RegistryError::XpubAlreadyOwned);
        }
        self.pools.push(pool);
        Ok(())
    }

    /// Record a successful fetch time on the matching owned or pool address.
    pub(crate) fn stamp_address(&mut self, value: &str, timestamp: i64) -> Option<BitcoinAddress> {
        for owned in &mut self.addresses {
            if owned.address.value == value {
                owned.address.last_update = Some(timestamp);
                return Some(owned.address.clone());
            }
        }
        for pool in &mut self.pools {
            for address in &mut pool.addresses {
                if address.value == value {
                    address.last_update = Some(timestamp);
                    return Some(address.clone());
                }
            }
        }
        None
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Account {}

impl Hash for Account {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
